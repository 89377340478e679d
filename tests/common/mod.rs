//! Shared test harness: an in-memory repository standing in for MongoDB, plus
//! request helpers used by the HTTP-level test suites.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use bson::{Bson, Document, oid::ObjectId};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use mongo_api_template::{
    AppConfig, AppState, Repository, RepositoryState, create_router,
    error::ApiError,
    pagination::{Page, PageQuery, SortOrder, lookup_path},
};

/// MockRepository
///
/// An honest in-memory implementation of the repository contract: filtering,
/// sorting, and cursor boundaries are computed against plain vectors, so the
/// HTTP-level tests exercise the real validation and page-shaping code paths
/// end to end without a running document store.
pub struct MockRepository {
    data: Mutex<HashMap<String, Vec<Document>>>,
    fail: bool,
}

impl MockRepository {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            fail: true,
        }
    }

    pub fn seed(self, collection: &str, documents: Vec<Document>) -> Self {
        self.data
            .lock()
            .unwrap()
            .insert(collection.to_string(), documents);
        self
    }

    fn check_up(&self) -> Result<(), ApiError> {
        if self.fail {
            Err(ApiError::Internal("simulated store failure".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Comparable projection of a document under a given sort field: the field
/// value (None sorts first, like a missing field in Mongo) plus the id as
/// tie-breaker.
fn sort_key(document: &Document, field: &str) -> (Option<String>, String) {
    let value = lookup_path(document, field).and_then(|v| match v {
        Bson::String(s) => Some(s),
        Bson::DateTime(dt) => dt.try_to_rfc3339_string().ok(),
        other => Some(other.to_string()),
    });
    let id = document
        .get_object_id("_id")
        .map(|id| id.to_hex())
        .unwrap_or_default();
    (value, id)
}

#[async_trait]
impl Repository for MockRepository {
    async fn insert_document(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<ObjectId, ApiError> {
        self.check_up()?;
        let id = ObjectId::new();
        document.insert("_id", id);
        self.data
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    async fn get_document(
        &self,
        collection: &str,
        id: ObjectId,
    ) -> Result<Option<Document>, ApiError> {
        self.check_up()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .get(collection)
            .and_then(|docs| {
                docs.iter()
                    .find(|d| d.get_object_id("_id") == Ok(id))
                    .cloned()
            }))
    }

    async fn update_document(
        &self,
        collection: &str,
        id: ObjectId,
        set: Document,
    ) -> Result<Option<Document>, ApiError> {
        self.check_up()?;
        let mut data = self.data.lock().unwrap();
        let Some(docs) = data.get_mut(collection) else {
            return Ok(None);
        };
        let Some(target) = docs
            .iter_mut()
            .find(|d| d.get_object_id("_id") == Ok(id))
        else {
            return Ok(None);
        };
        for (key, value) in set {
            target.insert(key, value);
        }
        Ok(Some(target.clone()))
    }

    async fn page_documents(
        &self,
        collection: &str,
        query: &PageQuery,
    ) -> Result<Page, ApiError> {
        self.check_up()?;
        let all = self
            .data
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default();
        let ascending = query.order == SortOrder::Asc;

        let mut rows: Vec<Document> = all
            .iter()
            .filter(|d| match &query.name {
                None => true,
                Some(needle) => d
                    .get_str("name")
                    .map(|name| name.to_lowercase().contains(&needle.to_lowercase()))
                    .unwrap_or(false),
            })
            .cloned()
            .collect();

        rows.sort_by_key(|d| sort_key(d, &query.sort_by));
        if !ascending {
            rows.reverse();
        }

        if let Some(after_id) = query.after_id {
            // Same boundary semantics as the real executor: anchor on the
            // cursor document's sort value when it still exists, otherwise fall
            // back to a plain id comparison.
            let cursor_doc = all
                .iter()
                .find(|d| d.get_object_id("_id") == Ok(after_id));
            match cursor_doc {
                Some(cursor_doc) => {
                    let boundary = sort_key(cursor_doc, &query.sort_by);
                    rows.retain(|d| {
                        let key = sort_key(d, &query.sort_by);
                        if ascending { key > boundary } else { key < boundary }
                    });
                }
                None => {
                    let boundary = after_id.to_hex();
                    rows.retain(|d| {
                        let id = d
                            .get_object_id("_id")
                            .map(|id| id.to_hex())
                            .unwrap_or_default();
                        if ascending { id > boundary } else { id < boundary }
                    });
                }
            }
        }

        rows.truncate(query.limit as usize + 1);
        Ok(Page::from_fetched(rows, query.limit))
    }
}

/// Deterministic object id from a small counter, ordered by construction.
pub fn oid(n: u32) -> ObjectId {
    ObjectId::parse_str(format!("{n:024x}")).unwrap()
}

/// Application state over a seeded mock repository and the default (local)
/// test configuration.
pub fn app_with(repo: MockRepository) -> Router {
    let state = AppState::new(Arc::new(repo) as RepositoryState, AppConfig::default());
    create_router(state)
}

/// Sends a request and returns status plus parsed JSON body (Null for empty
/// bodies).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body read failed")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

/// GET request authenticated through the local header bypass.
pub fn get_as(uri: &str, roles: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-user-id", "tester")
        .header("x-user-roles", roles)
        .body(Body::empty())
        .unwrap()
}

/// JSON-carrying request (POST/PATCH) through the local header bypass.
pub fn json_as(method: &str, uri: &str, roles: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", "tester")
        .header("x-user-roles", roles)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}
