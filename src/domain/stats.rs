//! Aggregate metrics over the item collection.

use time::{Duration, OffsetDateTime};

use super::items::Item;

pub use catalog_api_types::StatsSnapshot;

/// Summarise the whole collection at the given instant.
pub fn summarize(items: &[Item], at: OffsetDateTime) -> StatsSnapshot {
    let total = items.len();
    let average_price = if total == 0 {
        0.0
    } else {
        items.iter().map(|item| item.price).sum::<f64>() / total as f64
    };

    StatsSnapshot {
        total: total as u64,
        average_price,
        last_updated: at,
    }
}

/// Timestamp for a snapshot that replaces `previous`.
///
/// Never returns an instant at or before the previous snapshot, even when the
/// clock resolution is coarse or the clock stepped backwards.
pub fn next_stamp(previous: Option<&StatsSnapshot>, now: OffsetDateTime) -> OffsetDateTime {
    match previous {
        Some(previous) if now <= previous.last_updated => {
            previous.last_updated + Duration::microseconds(1)
        }
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn priced(prices: &[f64]) -> Vec<Item> {
        prices
            .iter()
            .enumerate()
            .map(|(idx, price)| Item {
                id: idx as u64 + 1,
                name: format!("Item {idx}"),
                price: *price,
                category: "Test".to_string(),
            })
            .collect()
    }

    #[test]
    fn average_over_three_items() {
        let at = datetime!(2024-01-01 00:00 UTC);
        let snapshot = summarize(&priced(&[10.0, 5.0, 8.0]), at);

        assert_eq!(snapshot.total, 3);
        assert!((snapshot.average_price - 23.0 / 3.0).abs() < 1e-12);
        assert_eq!(snapshot.last_updated, at);
    }

    #[test]
    fn empty_collection_averages_to_zero() {
        let snapshot = summarize(&[], datetime!(2024-01-01 00:00 UTC));
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.average_price, 0.0);
    }

    #[test]
    fn stamp_moves_forward_when_clock_does_not() {
        let first = summarize(&[], datetime!(2024-01-01 00:00 UTC));
        let stamp = next_stamp(Some(&first), datetime!(2023-12-31 23:59 UTC));
        assert!(stamp > first.last_updated);

        let later = datetime!(2024-02-01 00:00 UTC);
        assert_eq!(next_stamp(Some(&first), later), later);
        assert_eq!(next_stamp(None, later), later);
    }
}
