//! Wire types shared by the catalog server and its clients.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Response header carrying the number of items that matched a list query
/// before pagination was applied.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Unique item identifier.
pub type ItemId = u64;

/// A catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub price: f64,
    pub category: String,
}

/// Body accepted by `POST /api/items`.
///
/// Every field is optional at the wire level so that missing fields surface as
/// field-level validation errors instead of opaque decode failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl CreateItemRequest {
    pub fn new(name: impl Into<String>, price: f64, category: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            price: Some(price),
            category: Some(category.into()),
        }
    }
}

/// Query string accepted by `GET /api/items`.
///
/// `limit` and `page` stay textual here; the server validates them and answers
/// `400` for anything that is not a positive integer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

/// Aggregate metrics over the whole item collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total: u64,
    pub average_price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn stats_snapshot_uses_camel_case_and_iso_timestamp() {
        let snapshot = StatsSnapshot {
            total: 3,
            average_price: 7.5,
            last_updated: datetime!(2024-05-01 12:30:00 UTC),
        };

        let value = serde_json::to_value(&snapshot).expect("serialize snapshot");
        assert_eq!(
            value,
            json!({
                "total": 3,
                "averagePrice": 7.5,
                "lastUpdated": "2024-05-01T12:30:00Z"
            })
        );
    }

    #[test]
    fn create_request_rejects_unknown_fields() {
        let err = serde_json::from_value::<CreateItemRequest>(json!({
            "name": "Apple",
            "price": 1,
            "category": "Food",
            "id": 7
        }))
        .expect_err("unknown field should be rejected");
        assert!(err.to_string().contains("unknown field `id`"));
    }

    #[test]
    fn create_request_tolerates_missing_fields() {
        let request: CreateItemRequest =
            serde_json::from_value(json!({})).expect("empty body decodes");
        assert_eq!(request, CreateItemRequest::default());
    }
}
