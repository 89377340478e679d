use std::collections::BTreeSet;

use bson::Document;

use crate::auth::AuthUser;
use crate::breadcrumb::Breadcrumb;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::pagination::{Page, PageParams, PageQuery};
use crate::repository::RepositoryState;
use crate::services::{parse_object_id, reject_restricted};

/// ControlService
///
/// The full-lifecycle domain: create, list (paginated), get, and update.
/// Control documents carry both audit stamps: `created` is written once,
/// `saved` is refreshed on every update.
#[derive(Clone)]
pub struct ControlService {
    repo: RepositoryState,
    collection: String,
    sort_fields: BTreeSet<String>,
}

impl ControlService {
    pub fn new(repo: RepositoryState, config: &AppConfig) -> Self {
        Self {
            repo,
            collection: config.control_collection.clone(),
            sort_fields: config.sort_policy.allowed("control"),
        }
    }

    /// Creates a control document. Any client-supplied `_id` is dropped so the
    /// store assigns the identifier, and the system-managed stamps are set from
    /// the request breadcrumb.
    pub async fn create(
        &self,
        auth: &AuthUser,
        crumb: &Breadcrumb,
        mut data: Document,
    ) -> Result<Document, ApiError> {
        auth.require_writer()?;

        data.remove("_id");
        let stamp = crumb.to_document();
        data.insert("created", stamp.clone());
        data.insert("saved", stamp);

        let id = self.repo.insert_document(&self.collection, data).await?;
        tracing::info!(id = %id.to_hex(), user = %auth.user_id, "created control document");

        self.repo
            .get_document(&self.collection, id)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(format!("control {} missing after insert", id.to_hex()))
            })
    }

    /// One page of control documents in the requested sort order.
    pub async fn page(&self, auth: &AuthUser, params: PageParams) -> Result<Page, ApiError> {
        let query = PageQuery::from_params(params, &self.sort_fields)?;
        let page = self.repo.page_documents(&self.collection, &query).await?;
        tracing::info!(
            count = page.items.len(),
            has_more = page.has_more,
            user = %auth.user_id,
            "paged control documents"
        );
        Ok(page)
    }

    pub async fn get(&self, auth: &AuthUser, id: &str) -> Result<Document, ApiError> {
        let id = parse_object_id(id, "id")?;
        let document = self
            .repo
            .get_document(&self.collection, id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Control {} not found", id.to_hex())))?;
        tracing::info!(id = %id.to_hex(), user = %auth.user_id, "retrieved control document");
        Ok(document)
    }

    /// Merges the provided fields into an existing document and refreshes the
    /// `saved` stamp. Updates to `_id`, `created`, or `saved` are refused.
    pub async fn update(
        &self,
        auth: &AuthUser,
        crumb: &Breadcrumb,
        id: &str,
        data: Document,
    ) -> Result<Document, ApiError> {
        auth.require_writer()?;
        reject_restricted(&data)?;
        let id = parse_object_id(id, "id")?;

        let mut set = data;
        set.insert("saved", crumb.to_document());

        let updated = self
            .repo
            .update_document(&self.collection, id, set)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Control {} not found", id.to_hex())))?;
        tracing::info!(id = %id.to_hex(), user = %auth.user_id, "updated control document");
        Ok(updated)
    }
}
