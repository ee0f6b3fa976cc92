//! OpenSearch query builders.
//!
//! This module provides the index-agnostic queries used by every catalog:
//! the skip-set aggregation, the id projection used for scrolling and the
//! single-term delete filter.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::SearchError;
use lms_search_shared::IngestStamp;

/// Upper bound on aggregation buckets and page sizes.
///
/// Results beyond this many ids are silently truncated by the engine, so
/// callers batch candidate sets below it.
pub const SIZE_LIMIT: usize = 10_000;

/// Build the aggregation query that finds which candidates are already indexed.
///
/// The query filters on `field` ∈ `candidates` and, when `ingested_since` is
/// given, on `ingest_field >= stamp`. Only the aggregation is needed, so no
/// hits are returned.
pub fn build_skip_set_query<K: Serialize>(
    field: &str,
    candidates: &[K],
    ingested_since: Option<(&str, &IngestStamp)>,
) -> Value {
    let mut filters = Vec::with_capacity(2);
    if let Some((ingest_field, stamp)) = ingested_since {
        filters.push(json!({
            "range": {
                ingest_field: {
                    "gte": stamp.to_range_bound()
                }
            }
        }));
    }
    filters.push(json!({
        "terms": {
            field: candidates
        }
    }));

    json!({
        "query": {
            "bool": {
                "filter": filters
            }
        },
        "aggs": {
            field: {
                "terms": {
                    "field": field,
                    "size": SIZE_LIMIT
                }
            }
        },
        "size": 0
    })
}

/// Read the bucket keys of a terms aggregation.
pub fn parse_aggregation_keys<K: DeserializeOwned>(
    response: &Value,
    aggregation: &str,
) -> Result<Vec<K>, SearchError> {
    let buckets = response
        .get("aggregations")
        .and_then(|aggs| aggs.get(aggregation))
        .and_then(|agg| agg.get("buckets"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SearchError::parse(format!("Missing buckets for aggregation '{}'", aggregation))
        })?;

    buckets
        .iter()
        .map(|bucket| {
            let key = bucket
                .get("key")
                .cloned()
                .ok_or_else(|| SearchError::parse("Bucket without key"))?;
            serde_json::from_value(key).map_err(|e| SearchError::parse(e.to_string()))
        })
        .collect()
}

/// Match every document, returning only `field` from the source.
pub fn build_id_projection_query(field: &str) -> Value {
    json!({
        "query": {
            "match_all": {}
        },
        "_source": [field],
        "size": SIZE_LIMIT
    })
}

/// Read `field` from a hit's `_source`.
pub fn parse_source_field<K: DeserializeOwned>(source: &Value, field: &str) -> Option<K> {
    source
        .get(field)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
}

/// Match documents whose `field` equals `value`.
pub fn build_term_query<V: Serialize>(field: &str, value: V) -> Value {
    json!({
        "query": {
            "term": {
                field: value
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> IngestStamp {
        serde_json::from_str("\"2024-03-01T10:00:00Z\"").unwrap()
    }

    #[test]
    fn test_skip_set_query_with_stamp() {
        let query = build_skip_set_query("courseId", &[1, 2], Some(("ingestTime", &stamp())));

        assert_eq!(
            query,
            json!({
                "query": {
                    "bool": {
                        "filter": [
                            {"range": {"ingestTime": {"gte": "2024-03-01T10:00:00+00:00"}}},
                            {"terms": {"courseId": [1, 2]}}
                        ]
                    }
                },
                "aggs": {
                    "courseId": {
                        "terms": {"field": "courseId", "size": 10000}
                    }
                },
                "size": 0
            })
        );
    }

    #[test]
    fn test_skip_set_query_without_stamp_has_only_terms() {
        let query = build_skip_set_query("learningMaterialId", &[5], None);

        let filters = query["query"]["bool"]["filter"].as_array().unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0]["terms"]["learningMaterialId"], json!([5]));
    }

    #[test]
    fn test_parse_aggregation_keys() {
        let response = json!({
            "aggregations": {
                "courseId": {"buckets": [{"key": 1, "doc_count": 3}, {"key": 4, "doc_count": 1}]}
            }
        });

        let keys: Vec<i64> = parse_aggregation_keys(&response, "courseId").unwrap();
        assert_eq!(keys, vec![1, 4]);
    }

    #[test]
    fn test_parse_aggregation_keys_missing() {
        let result: Result<Vec<i64>, _> = parse_aggregation_keys(&json!({}), "courseId");
        assert!(matches!(result, Err(SearchError::ParseError(_))));
    }

    #[test]
    fn test_id_projection_query() {
        let query = build_id_projection_query("sessionId");

        assert!(query["query"]["match_all"].is_object());
        assert_eq!(query["_source"], json!(["sessionId"]));
        assert_eq!(query["size"], 10000);
    }

    #[test]
    fn test_parse_source_field() {
        let source = json!({"learningMaterialId": 12, "id": "lm_0_12"});

        assert_eq!(parse_source_field::<i64>(&source, "learningMaterialId"), Some(12));
        assert_eq!(parse_source_field::<i64>(&source, "missing"), None);
        assert_eq!(parse_source_field::<i64>(&source, "id"), None);
    }

    #[test]
    fn test_term_query() {
        assert_eq!(
            build_term_query("learningMaterialId", 9),
            json!({"query": {"term": {"learningMaterialId": 9}}})
        );
    }
}
