use std::sync::Arc;

use async_trait::async_trait;
use bson::{Document, doc, oid::ObjectId};
use futures::stream::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use crate::error::ApiError;
use crate::pagination::{CursorBoundary, Page, PageQuery, build_filter, lookup_path, sort_spec};

/// Repository Trait
///
/// The abstract contract for all persistence operations, keyed by collection
/// name since documents are opaque. Services talk to this trait and never to the
/// driver, which is what lets the integration tests substitute an in-memory
/// implementation.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Inserts a document and returns the store-assigned object id.
    async fn insert_document(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<ObjectId, ApiError>;

    /// Fetches a single document by id. `None` when absent.
    async fn get_document(
        &self,
        collection: &str,
        id: ObjectId,
    ) -> Result<Option<Document>, ApiError>;

    /// Applies a `$set` update and returns the post-update document, or `None`
    /// when the id does not exist.
    async fn update_document(
        &self,
        collection: &str,
        id: ObjectId,
        set: Document,
    ) -> Result<Option<Document>, ApiError>;

    /// Executes a validated page query: filter + sort, fetching `limit + 1`
    /// records, shaped into a page with the forward cursor. Read-only.
    async fn page_documents(&self, collection: &str, query: &PageQuery)
    -> Result<Page, ApiError>;
}

/// The concrete type used to share the persistence layer across the application
/// state.
pub type RepositoryState = Arc<dyn Repository>;

/// MongoRepository
///
/// The production implementation, backed by a MongoDB database handle. Holds no
/// per-call state; every method is an independent read or write against the
/// shared store, and driver failures surface as `StorageUnavailable`.
pub struct MongoRepository {
    db: Database,
}

impl MongoRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }

    /// Turns the request cursor into a boundary constraint. For non-id sort
    /// fields the cursor document is resolved so the boundary can anchor on its
    /// sort-field value; if the document has since been deleted or lacks the
    /// field, the plain id range keeps the walk going instead of erroring.
    async fn resolve_boundary(
        &self,
        collection: &str,
        after_id: ObjectId,
        sort_by: &str,
    ) -> Result<CursorBoundary, ApiError> {
        if sort_by == "_id" {
            return Ok(CursorBoundary::IdRange(after_id));
        }

        let cursor_doc = self
            .collection(collection)
            .find_one(doc! { "_id": after_id })
            .await?;

        Ok(match cursor_doc.as_ref().and_then(|d| lookup_path(d, sort_by)) {
            Some(value) => CursorBoundary::Compound {
                value,
                id: after_id,
            },
            None => CursorBoundary::IdRange(after_id),
        })
    }
}

#[async_trait]
impl Repository for MongoRepository {
    async fn insert_document(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<ObjectId, ApiError> {
        let result = self.collection(collection).insert_one(document).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| ApiError::Internal("insert did not yield an object id".to_string()))
    }

    async fn get_document(
        &self,
        collection: &str,
        id: ObjectId,
    ) -> Result<Option<Document>, ApiError> {
        let document = self
            .collection(collection)
            .find_one(doc! { "_id": id })
            .await?;
        Ok(document)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: ObjectId,
        set: Document,
    ) -> Result<Option<Document>, ApiError> {
        let updated = self
            .collection(collection)
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    async fn page_documents(
        &self,
        collection: &str,
        query: &PageQuery,
    ) -> Result<Page, ApiError> {
        let boundary = match query.after_id {
            None => None,
            Some(after_id) => Some(
                self.resolve_boundary(collection, after_id, &query.sort_by)
                    .await?,
            ),
        };

        let filter = build_filter(query, boundary.as_ref());
        let sort = sort_spec(query);

        let cursor = self
            .collection(collection)
            .find(filter)
            .sort(sort)
            .limit(query.limit + 1)
            .await?;
        let items: Vec<Document> = cursor.try_collect().await?;

        Ok(Page::from_fetched(items, query.limit))
    }
}
