use std::collections::BTreeSet;

use bson::Document;

use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::pagination::{Page, PageParams, PageQuery};
use crate::repository::RepositoryState;
use crate::services::parse_object_id;

/// ConsumeService
///
/// The read-only domain: list (paginated) and get. Any authenticated caller may
/// read; there is no write surface at all.
#[derive(Clone)]
pub struct ConsumeService {
    repo: RepositoryState,
    collection: String,
    sort_fields: BTreeSet<String>,
}

impl ConsumeService {
    pub fn new(repo: RepositoryState, config: &AppConfig) -> Self {
        Self {
            repo,
            collection: config.consume_collection.clone(),
            sort_fields: config.sort_policy.allowed("consume"),
        }
    }

    pub async fn page(&self, auth: &AuthUser, params: PageParams) -> Result<Page, ApiError> {
        let query = PageQuery::from_params(params, &self.sort_fields)?;
        let page = self.repo.page_documents(&self.collection, &query).await?;
        tracing::info!(
            count = page.items.len(),
            has_more = page.has_more,
            user = %auth.user_id,
            "paged consume documents"
        );
        Ok(page)
    }

    pub async fn get(&self, auth: &AuthUser, id: &str) -> Result<Document, ApiError> {
        let id = parse_object_id(id, "id")?;
        let document = self
            .repo
            .get_document(&self.collection, id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Consume {} not found", id.to_hex())))?;
        tracing::info!(id = %id.to_hex(), user = %auth.user_id, "retrieved consume document");
        Ok(document)
    }
}
