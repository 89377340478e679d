//! Cursor-based pagination for list endpoints.
//!
//! This is the one piece of the template with real algorithmic content: it turns a
//! set of untyped request parameters into a validated filter + sort specification,
//! and shapes the fetched rows into a page with a forward cursor. Executing the
//! query belongs to the repository layer; everything in this module is pure and
//! synchronous, so it can be tested without a running document store.

use std::collections::BTreeSet;

use bson::{Bson, Document, doc, oid::ObjectId};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::ApiError;

/// Items returned per page when the client does not say otherwise.
pub const DEFAULT_LIMIT: i64 = 10;
/// Hard ceiling on page size. Larger requests are rejected, not clamped.
pub const MAX_LIMIT: i64 = 100;
/// Default sort key shared by all three resource domains.
pub const DEFAULT_SORT_FIELD: &str = "name";

/// Raw query parameters as they arrive on a list endpoint. Nothing here is
/// trusted; `PageQuery::from_params` is the only path to a usable query.
/// Unrecognized query keys are dropped by the extractor, mirroring the
/// minimal-search design: only a name substring filter is supported.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Case-insensitive substring filter on the `name` field.
    pub name: Option<String>,
    /// Hex object id of the last item already seen (forward cursor).
    pub after_id: Option<String>,
    /// Page size, 1..=100, default 10.
    pub limit: Option<i64>,
    /// Sort field, validated against the resource's allow-list.
    pub sort_by: Option<String>,
    /// `asc` or `desc`, default `asc`.
    pub order: Option<String>,
}

/// Sort direction for a single-key sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn parse(raw: &str) -> Result<Self, ApiError> {
        match raw {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ApiError::invalid("order", "order must be 'asc' or 'desc'")),
        }
    }

    /// Mongo sort direction: +1 ascending, -1 descending.
    pub fn direction(&self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }

    /// Comparison operator that moves the cursor boundary forward in this order.
    pub fn comparator(&self) -> &'static str {
        match self {
            SortOrder::Asc => "$gt",
            SortOrder::Desc => "$lt",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// A fully validated page request. Construction fails fast: any violation yields
/// `InvalidParameter` naming the offending field, and no defaulting is applied to
/// an out-of-range value.
#[derive(Debug, Clone)]
pub struct PageQuery {
    pub name: Option<String>,
    pub after_id: Option<ObjectId>,
    pub limit: i64,
    pub sort_by: String,
    pub order: SortOrder,
}

impl PageQuery {
    pub fn from_params(params: PageParams, allowed: &BTreeSet<String>) -> Result<Self, ApiError> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
        if limit < 1 {
            return Err(ApiError::invalid("limit", "limit must be >= 1"));
        }
        if limit > MAX_LIMIT {
            return Err(ApiError::invalid("limit", "limit must be <= 100"));
        }

        let sort_by = params
            .sort_by
            .unwrap_or_else(|| DEFAULT_SORT_FIELD.to_string());
        if !allowed.contains(&sort_by) {
            let fields = allowed.iter().cloned().collect::<Vec<_>>().join(", ");
            return Err(ApiError::invalid(
                "sort_by",
                format!("sort_by must be one of: {fields}"),
            ));
        }

        let order = match params.order.as_deref() {
            None => SortOrder::Asc,
            Some(raw) => SortOrder::parse(raw)?,
        };

        let after_id = match params.after_id.as_deref().filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => Some(ObjectId::parse_str(raw).map_err(|_| {
                ApiError::invalid("after_id", "after_id must be a valid object id")
            })?),
        };

        Ok(Self {
            name: params.name.filter(|n| !n.is_empty()),
            after_id,
            limit,
            sort_by,
            order,
        })
    }
}

/// The cursor translated into a filter constraint.
///
/// A bare `_id` range is only correct when the sort order coincides with id
/// creation order. For arbitrary sort fields the executor resolves the cursor
/// document and anchors on its sort-field value, with the id as tie-breaker, so
/// page walks neither skip nor duplicate records. `IdRange` remains the fallback
/// when the cursor document has been deleted or lacks the sort field.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorBoundary {
    IdRange(ObjectId),
    Compound { value: Bson, id: ObjectId },
}

/// Builds the combined filter document: optional name regex plus the cursor
/// boundary constraint. Read-only callers pass `None` for an un-cursored first
/// page.
pub fn build_filter(query: &PageQuery, boundary: Option<&CursorBoundary>) -> Document {
    let mut filter = Document::new();

    if let Some(name) = &query.name {
        filter.insert("name", doc! { "$regex": name.clone(), "$options": "i" });
    }

    if let Some(boundary) = boundary {
        let op = query.order.comparator();
        match boundary {
            CursorBoundary::IdRange(id) => {
                let mut range = Document::new();
                range.insert(op, *id);
                filter.insert("_id", range);
            }
            CursorBoundary::Compound { value, id } => {
                // Strictly past the cursor's sort value, or equal to it and past
                // its id. Keys are inserted dynamically because the sort field may
                // be a dotted path.
                let mut past_value = Document::new();
                past_value.insert(op, value.clone());
                let mut beyond = Document::new();
                beyond.insert(query.sort_by.clone(), past_value);

                let mut past_id = Document::new();
                past_id.insert(op, *id);
                let mut tied = Document::new();
                tied.insert(query.sort_by.clone(), value.clone());
                tied.insert("_id", past_id);

                filter.insert("$or", vec![Bson::Document(beyond), Bson::Document(tied)]);
            }
        }
    }

    filter
}

/// Builds the sort directive: the requested field plus an `_id` tie-breaker so
/// that documents with equal sort values have a stable, cursor-safe order.
pub fn sort_spec(query: &PageQuery) -> Document {
    let mut sort = Document::new();
    sort.insert(query.sort_by.clone(), query.order.direction());
    if query.sort_by != "_id" {
        sort.insert("_id", query.order.direction());
    }
    sort
}

/// Resolves a (possibly dotted) field path inside a document, e.g.
/// `created.at_time`.
pub fn lookup_path(document: &Document, path: &str) -> Option<Bson> {
    let mut current = document;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let value = current.get(segment)?;
        if segments.peek().is_none() {
            return Some(value.clone());
        }
        current = value.as_document()?;
    }
    None
}

/// One page of results, shaped from a `limit + 1` fetch.
///
/// Invariant: `has_more` is true iff a record exists beyond the last returned
/// item, and `next_cursor` is the id of `items[last]` exactly when `has_more`
/// holds. The two fields are derived together and can never disagree.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Document>,
    pub limit: i64,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl Page {
    /// Fetching one extra record bounds the "is there more" check to O(1) extra
    /// cost and avoids a second count query over the whole collection.
    pub fn from_fetched(mut items: Vec<Document>, limit: i64) -> Self {
        let has_more = items.len() as i64 > limit;
        let next_cursor = if has_more {
            items.truncate(limit as usize);
            items
                .last()
                .and_then(|d| d.get_object_id("_id").ok())
                .map(|id| id.to_hex())
        } else {
            None
        };

        Self {
            items,
            limit,
            has_more,
            next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> BTreeSet<String> {
        ["name", "description", "created.at_time"]
            .iter()
            .map(|f| f.to_string())
            .collect()
    }

    fn params(limit: Option<i64>, sort_by: Option<&str>, order: Option<&str>) -> PageParams {
        PageParams {
            name: None,
            after_id: None,
            limit,
            sort_by: sort_by.map(String::from),
            order: order.map(String::from),
        }
    }

    fn param_of(err: ApiError) -> &'static str {
        match err {
            ApiError::InvalidParameter { param, .. } => param,
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn defaults_apply_when_params_are_absent() {
        let query = PageQuery::from_params(PageParams::default(), &allowed()).unwrap();
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.sort_by, "name");
        assert_eq!(query.order, SortOrder::Asc);
        assert!(query.after_id.is_none());
        assert!(query.name.is_none());
    }

    #[test]
    fn limit_bounds_are_inclusive() {
        assert!(PageQuery::from_params(params(Some(1), None, None), &allowed()).is_ok());
        assert!(PageQuery::from_params(params(Some(100), None, None), &allowed()).is_ok());

        let low = PageQuery::from_params(params(Some(0), None, None), &allowed()).unwrap_err();
        assert_eq!(param_of(low), "limit");
        let high = PageQuery::from_params(params(Some(101), None, None), &allowed()).unwrap_err();
        assert_eq!(param_of(high), "limit");
    }

    #[test]
    fn sort_by_outside_allow_list_names_the_allowed_set() {
        let err =
            PageQuery::from_params(params(None, Some("password"), None), &allowed()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("created.at_time"));
        assert!(message.contains("description"));
        assert!(message.contains("name"));
        assert_eq!(param_of(err), "sort_by");
    }

    #[test]
    fn order_must_be_asc_or_desc() {
        let err =
            PageQuery::from_params(params(None, None, Some("sideways")), &allowed()).unwrap_err();
        assert_eq!(param_of(err), "order");
        let ok = PageQuery::from_params(params(None, None, Some("desc")), &allowed()).unwrap();
        assert_eq!(ok.order, SortOrder::Desc);
    }

    #[test]
    fn malformed_after_id_is_rejected() {
        let raw = PageParams {
            after_id: Some("not-an-id".to_string()),
            ..Default::default()
        };
        let err = PageQuery::from_params(raw, &allowed()).unwrap_err();
        assert_eq!(param_of(err), "after_id");
    }

    #[test]
    fn well_formed_after_id_parses() {
        let raw = PageParams {
            after_id: Some("507f1f77bcf86cd799439011".to_string()),
            ..Default::default()
        };
        let query = PageQuery::from_params(raw, &allowed()).unwrap();
        assert_eq!(
            query.after_id.unwrap().to_hex(),
            "507f1f77bcf86cd799439011"
        );
    }

    #[test]
    fn name_filter_becomes_a_case_insensitive_regex() {
        let raw = PageParams {
            name: Some("al".to_string()),
            ..Default::default()
        };
        let query = PageQuery::from_params(raw, &allowed()).unwrap();
        let filter = build_filter(&query, None);
        let regex = filter.get_document("name").unwrap();
        assert_eq!(regex.get_str("$regex").unwrap(), "al");
        assert_eq!(regex.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn id_range_boundary_uses_gt_for_asc_and_lt_for_desc() {
        let id = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let mut query = PageQuery::from_params(PageParams::default(), &allowed()).unwrap();

        let filter = build_filter(&query, Some(&CursorBoundary::IdRange(id)));
        assert!(filter.get_document("_id").unwrap().contains_key("$gt"));

        query.order = SortOrder::Desc;
        let filter = build_filter(&query, Some(&CursorBoundary::IdRange(id)));
        assert!(filter.get_document("_id").unwrap().contains_key("$lt"));
    }

    #[test]
    fn compound_boundary_anchors_on_sort_value_with_id_tiebreak() {
        let id = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let query = PageQuery::from_params(PageParams::default(), &allowed()).unwrap();
        let boundary = CursorBoundary::Compound {
            value: Bson::String("bob".to_string()),
            id,
        };

        let filter = build_filter(&query, Some(&boundary));
        let arms = filter.get_array("$or").unwrap();
        assert_eq!(arms.len(), 2);

        let beyond = arms[0].as_document().unwrap();
        assert!(beyond.get_document("name").unwrap().contains_key("$gt"));

        let tied = arms[1].as_document().unwrap();
        assert_eq!(tied.get_str("name").unwrap(), "bob");
        assert!(tied.get_document("_id").unwrap().contains_key("$gt"));
    }

    #[test]
    fn sort_spec_appends_id_tiebreaker() {
        let query = PageQuery::from_params(params(None, Some("description"), None), &allowed())
            .unwrap();
        let sort = sort_spec(&query);
        let keys: Vec<_> = sort.keys().collect();
        assert_eq!(keys, vec!["description", "_id"]);
        assert_eq!(sort.get_i32("description").unwrap(), 1);
        assert_eq!(sort.get_i32("_id").unwrap(), 1);
    }

    #[test]
    fn lookup_path_resolves_nested_fields() {
        let document = doc! { "created": { "at_time": "2024-01-01" }, "name": "x" };
        assert_eq!(
            lookup_path(&document, "created.at_time"),
            Some(Bson::String("2024-01-01".to_string()))
        );
        assert_eq!(
            lookup_path(&document, "name"),
            Some(Bson::String("x".to_string()))
        );
        assert_eq!(lookup_path(&document, "created.by_user"), None);
        assert_eq!(lookup_path(&document, "name.deeper"), None);
    }

    #[test]
    fn page_shaping_truncates_and_exposes_the_forward_cursor() {
        let ids: Vec<ObjectId> = (1..=3)
            .map(|n| ObjectId::parse_str(format!("5070000000000000000000{n:02}")).unwrap())
            .collect();
        let fetched: Vec<Document> = ids.iter().map(|id| doc! { "_id": id }).collect();

        let page = Page::from_fetched(fetched, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some(ids[1].to_hex().as_str()));
    }

    #[test]
    fn short_fetch_means_no_more_and_no_cursor() {
        let fetched = vec![doc! { "_id": ObjectId::new() }];
        let page = Page::from_fetched(fetched, 2);
        assert_eq!(page.items.len(), 1);
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn exact_limit_fetch_is_the_last_page() {
        let fetched = vec![
            doc! { "_id": ObjectId::new() },
            doc! { "_id": ObjectId::new() },
        ];
        let page = Page::from_fetched(fetched, 2);
        assert_eq!(page.items.len(), 2);
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }
}
