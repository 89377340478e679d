//! BSON to JSON response shaping.
//!
//! Documents come out of the store with BSON-specific types that have no natural
//! JSON spelling. Rather than leaking extended-JSON wrappers like `{"$oid": ...}`
//! to clients, object ids are rendered as their 24-character hex form and
//! datetimes as RFC 3339 strings, recursively through nested documents and
//! arrays.

use bson::{Bson, Document};
use serde_json::{Map, Value, json};

use crate::pagination::Page;

/// Converts a whole document, applying the scalar conversions below to every
/// field.
pub fn document_to_json(document: Document) -> Value {
    Value::Object(
        document
            .into_iter()
            .map(|(key, value)| (key, bson_to_json(value)))
            .collect::<Map<String, Value>>(),
    )
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Bson::Document(document) => document_to_json(document),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

/// Serializes a page into the wire shape of every list endpoint.
pub fn page_to_json(page: Page) -> Value {
    json!({
        "items": page
            .items
            .into_iter()
            .map(document_to_json)
            .collect::<Vec<Value>>(),
        "limit": page.limit,
        "has_more": page.has_more,
        "next_cursor": page.next_cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    #[test]
    fn object_ids_render_as_hex_strings() {
        let id = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let value = document_to_json(doc! { "_id": id, "name": "alice" });
        assert_eq!(value["_id"], json!("507f1f77bcf86cd799439011"));
        assert_eq!(value["name"], json!("alice"));
    }

    #[test]
    fn datetimes_render_as_rfc3339() {
        let value = document_to_json(doc! {
            "created": { "at_time": bson::DateTime::from_millis(0) }
        });
        assert_eq!(value["created"]["at_time"], json!("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn scalars_and_arrays_pass_through_plainly() {
        let value = document_to_json(doc! {
            "count": 3_i32,
            "big": 9_000_000_000_i64,
            "ratio": 0.5,
            "tags": ["a", "b"],
            "missing": Bson::Null,
        });
        assert_eq!(value["count"], json!(3));
        assert_eq!(value["big"], json!(9_000_000_000_i64));
        assert_eq!(value["ratio"], json!(0.5));
        assert_eq!(value["tags"], json!(["a", "b"]));
        assert_eq!(value["missing"], Value::Null);
    }

    #[test]
    fn page_wire_shape_has_the_four_fields() {
        let page = Page::from_fetched(vec![doc! { "_id": ObjectId::new() }], 10);
        let value = page_to_json(page);
        assert_eq!(value["limit"], json!(10));
        assert_eq!(value["has_more"], json!(false));
        assert_eq!(value["next_cursor"], Value::Null);
        assert_eq!(value["items"].as_array().unwrap().len(), 1);
    }
}
