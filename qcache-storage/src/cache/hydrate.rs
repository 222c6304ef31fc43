//! Payload hydration.
//!
//! Cached entries are plain JSON. Hydration turns them back into typed
//! documents, keeping the shape the store originally returned.

use qcache_core::{Document, HydrationError, QueryResult};
use serde_json::Value;

/// Rebuild a typed result from a cached payload.
///
/// - a JSON array becomes [`QueryResult::Many`], order preserved
/// - `null` becomes [`QueryResult::Empty`]
/// - anything else becomes [`QueryResult::One`]
///
/// A payload that is not JSON, or an element that does not fit `T`, is an
/// error. It is never treated as a miss.
pub fn hydrate<T: Document>(payload: &str) -> Result<QueryResult<T>, HydrationError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| HydrationError::CorruptPayload {
            reason: e.to_string(),
        })?;

    match value {
        Value::Null => Ok(QueryResult::Empty),
        Value::Array(items) => {
            let docs = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    serde_json::from_value(item).map_err(|e| HydrationError::InvalidElement {
                        index,
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<Vec<T>, _>>()?;
            Ok(QueryResult::Many(docs))
        }
        single => serde_json::from_value(single)
            .map(QueryResult::One)
            .map_err(|e| HydrationError::InvalidElement {
                index: 0,
                reason: e.to_string(),
            }),
    }
}

/// Serialize a result into the payload stored in the cache.
///
/// A single document that serializes as an array or `null` is rejected: its
/// payload would hydrate back as `Many` or `Empty`, so it is not cacheable.
pub fn dehydrate<T: Document>(result: &QueryResult<T>) -> Result<String, HydrationError> {
    let payload = serde_json::to_string(result).map_err(|e| HydrationError::SerializationFailed {
        reason: e.to_string(),
    })?;

    if matches!(result, QueryResult::One(_)) && (payload.starts_with('[') || payload == "null") {
        return Err(HydrationError::SerializationFailed {
            reason: "single document serializes as an array or null".to_string(),
        });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Blog {
        title: String,
        content: String,
    }

    fn blog(title: &str) -> Blog {
        Blog {
            title: title.to_string(),
            content: format!("{title} body"),
        }
    }

    #[test]
    fn test_hydrate_single_object() {
        let result = hydrate::<Blog>(r#"{"title":"Hi","content":"There"}"#)
            .expect("hydrate should succeed");
        assert_eq!(
            result,
            QueryResult::One(Blog {
                title: "Hi".to_string(),
                content: "There".to_string(),
            })
        );
    }

    #[test]
    fn test_hydrate_array_preserves_order() {
        let payload = dehydrate(&QueryResult::Many(vec![blog("c"), blog("a"), blog("b")]))
            .expect("dehydrate should succeed");
        let result = hydrate::<Blog>(&payload).expect("hydrate should succeed");
        assert_eq!(result, QueryResult::Many(vec![blog("c"), blog("a"), blog("b")]));
    }

    #[test]
    fn test_hydrate_empty_array() {
        let result = hydrate::<Blog>("[]").expect("hydrate should succeed");
        assert_eq!(result, QueryResult::Many(Vec::new()));
    }

    #[test]
    fn test_hydrate_null() {
        let result = hydrate::<Blog>("null").expect("hydrate should succeed");
        assert_eq!(result, QueryResult::Empty);
    }

    #[test]
    fn test_corrupt_payload_is_error() {
        let err = hydrate::<Blog>("{not json").expect_err("corrupt payload");
        assert!(matches!(err, HydrationError::CorruptPayload { .. }));
    }

    #[test]
    fn test_bad_element_reports_index() {
        let payload = r#"[{"title":"a","content":"x"},{"title":"b"}]"#;
        let err = hydrate::<Blog>(payload).expect_err("second element is missing content");
        assert!(matches!(err, HydrationError::InvalidElement { index: 1, .. }));
    }

    #[test]
    fn test_single_of_wrong_shape_is_error() {
        let err = hydrate::<Blog>("42").expect_err("number is not a blog");
        assert!(matches!(err, HydrationError::InvalidElement { index: 0, .. }));
    }

    #[test]
    fn test_untyped_documents() {
        let result = hydrate::<Value>(r#"[{"a":1},{"b":2}]"#).expect("hydrate should succeed");
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_dehydrate_rejects_ambiguous_single() {
        let array = dehydrate(&QueryResult::One(serde_json::json!([1, 2])));
        let null = dehydrate(&QueryResult::One(Value::Null));
        let strings = dehydrate(&QueryResult::One(vec!["a".to_string()]));

        assert!(matches!(array, Err(HydrationError::SerializationFailed { .. })));
        assert!(matches!(null, Err(HydrationError::SerializationFailed { .. })));
        assert!(matches!(strings, Err(HydrationError::SerializationFailed { .. })));
    }

    #[test]
    fn test_dehydrate_keeps_arrays_inside_many() {
        let payload = dehydrate(&QueryResult::Many(vec![serde_json::json!([1, 2])]))
            .expect("dehydrate should succeed");
        let result = hydrate::<Value>(&payload).expect("hydrate should succeed");
        assert_eq!(result, QueryResult::Many(vec![serde_json::json!([1, 2])]));
    }

    #[test]
    fn test_dehydrate_shapes() {
        assert_eq!(dehydrate::<Blog>(&QueryResult::Empty).unwrap(), "null");
        assert_eq!(
            dehydrate(&QueryResult::One(blog("x"))).unwrap(),
            r#"{"title":"x","content":"x body"}"#
        );
    }
}
