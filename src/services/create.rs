use std::collections::BTreeSet;

use bson::Document;

use crate::auth::AuthUser;
use crate::breadcrumb::Breadcrumb;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::pagination::{Page, PageParams, PageQuery};
use crate::repository::RepositoryState;
use crate::services::parse_object_id;

/// CreateService
///
/// The append-only domain: documents are created and read, never updated, so
/// they carry only the `created` stamp.
#[derive(Clone)]
pub struct CreateService {
    repo: RepositoryState,
    collection: String,
    sort_fields: BTreeSet<String>,
}

impl CreateService {
    pub fn new(repo: RepositoryState, config: &AppConfig) -> Self {
        Self {
            repo,
            collection: config.create_collection.clone(),
            sort_fields: config.sort_policy.allowed("create"),
        }
    }

    pub async fn create(
        &self,
        auth: &AuthUser,
        crumb: &Breadcrumb,
        mut data: Document,
    ) -> Result<Document, ApiError> {
        auth.require_writer()?;

        data.remove("_id");
        data.insert("created", crumb.to_document());

        let id = self.repo.insert_document(&self.collection, data).await?;
        tracing::info!(id = %id.to_hex(), user = %auth.user_id, "created create document");

        self.repo
            .get_document(&self.collection, id)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(format!("create {} missing after insert", id.to_hex()))
            })
    }

    pub async fn page(&self, auth: &AuthUser, params: PageParams) -> Result<Page, ApiError> {
        let query = PageQuery::from_params(params, &self.sort_fields)?;
        let page = self.repo.page_documents(&self.collection, &query).await?;
        tracing::info!(
            count = page.items.len(),
            has_more = page.has_more,
            user = %auth.user_id,
            "paged create documents"
        );
        Ok(page)
    }

    pub async fn get(&self, auth: &AuthUser, id: &str) -> Result<Document, ApiError> {
        let id = parse_object_id(id, "id")?;
        let document = self
            .repo
            .get_document(&self.collection, id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Create {} not found", id.to_hex())))?;
        tracing::info!(id = %id.to_hex(), user = %auth.user_id, "retrieved create document");
        Ok(document)
    }
}
