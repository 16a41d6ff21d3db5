use serde_json::Value;

use crate::executor::request::stringify;

/// Field vocabularies for page-shape detection. Fixed and documented: an API
/// using an unlisted name behaves as single-page.
const ITEM_FIELDS: &[&str] = &["items", "results", "data", "records", "list"];
const MORE_FIELDS: &[&str] = &["has_more", "hasMore", "more", "has_next", "hasNext"];
const NEXT_FIELDS: &[&str] = &[
    "next_cursor",
    "nextCursor",
    "next_token",
    "nextToken",
    "next_page",
    "nextPage",
    "next_offset",
    "next",
];
const TOTAL_FIELDS: &[&str] = &["total", "total_count", "totalCount", "count"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Continuation {
    /// Cursor for the next page; absent when the remote only signals "more"
    /// without one, in which case the same request is repeated up to the cap.
    pub cursor: Option<String>,
}

/// Items of one page: an array-valued body, then conventional field names,
/// then the first array-valued field.
pub(crate) fn extract_items(body: &Value) -> Option<Vec<Value>> {
    if let Some(arr) = body.as_array() {
        return Some(arr.clone());
    }
    let obj = body.as_object()?;
    for field in ITEM_FIELDS {
        if let Some(arr) = obj.get(*field).and_then(|v| v.as_array()) {
            return Some(arr.clone());
        }
    }
    obj.values().find_map(|v| v.as_array().cloned())
}

/// Continuation signal: a non-null "next"-style field (which also carries the
/// cursor) or a boolean "more"-style field.
pub(crate) fn continuation(body: &Value) -> Option<Continuation> {
    let obj = body.as_object()?;
    for field in NEXT_FIELDS {
        if let Some(v) = obj.get(*field) {
            if !v.is_null() {
                return Some(Continuation {
                    cursor: Some(stringify(v)),
                });
            }
        }
    }
    for field in MORE_FIELDS {
        if let Some(more) = obj.get(*field).and_then(Value::as_bool) {
            return more.then_some(Continuation { cursor: None });
        }
    }
    None
}

pub(crate) fn declared_total(body: &Value) -> Option<u64> {
    let obj = body.as_object()?;
    TOTAL_FIELDS
        .iter()
        .find_map(|f| obj.get(*f).and_then(Value::as_u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_body_is_items() {
        assert_eq!(
            extract_items(&json!([1, 2])),
            Some(vec![json!(1), json!(2)])
        );
    }

    #[test]
    fn conventional_field_beats_first_array_field() {
        let body = json!({"meta": [0], "results": [1, 2]});
        assert_eq!(
            extract_items(&body),
            Some(vec![json!(1), json!(2)])
        );
    }

    #[test]
    fn falls_back_to_first_array_valued_field() {
        let body = json!({"count": 2, "widgets": [1, 2]});
        assert_eq!(
            extract_items(&body),
            Some(vec![json!(1), json!(2)])
        );
    }

    #[test]
    fn next_field_carries_cursor() {
        let c = continuation(&json!({"next_cursor": "abc"})).unwrap();
        assert_eq!(c.cursor.as_deref(), Some("abc"));
        // Numeric cursors stringify bare.
        let c = continuation(&json!({"next_offset": 40})).unwrap();
        assert_eq!(c.cursor.as_deref(), Some("40"));
    }

    #[test]
    fn boolean_more_without_cursor() {
        assert_eq!(
            continuation(&json!({"has_more": true})),
            Some(Continuation { cursor: None })
        );
        assert_eq!(continuation(&json!({"has_more": false})), None);
        assert_eq!(continuation(&json!({"next": null})), None);
        assert_eq!(continuation(&json!({"rows": []})), None);
    }

    #[test]
    fn declared_total_from_conventional_fields() {
        assert_eq!(declared_total(&json!({"total_count": 7})), Some(7));
        assert_eq!(declared_total(&json!({"rows": []})), None);
    }
}
