//! Item records, candidate validation and id assignment.

use serde_json::{Map, Value};

use super::error::DomainError;

pub use catalog_api_types::{Item, ItemId};

const NAME_MIN_CHARS: usize = 2;
const KNOWN_FIELDS: [&str; 3] = ["name", "price", "category"];

/// A validated creation candidate that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub name: String,
    pub price: f64,
    pub category: String,
}

impl NewItem {
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            name: self.name,
            price: self.price,
            category: self.category,
        }
    }
}

/// Validate a raw create payload.
///
/// Fields are checked in declaration order and the first failure is returned,
/// so the message always names a single field.
pub fn validate_candidate(payload: &Value) -> Result<NewItem, DomainError> {
    let Value::Object(fields) = payload else {
        return Err(DomainError::validation("value", "must be of type object"));
    };

    let name = required_string(fields, "name")?;
    if name.chars().count() < NAME_MIN_CHARS {
        return Err(DomainError::validation(
            "name",
            format!("length must be at least {NAME_MIN_CHARS} characters long"),
        ));
    }

    let price = required_price(fields)?;
    let category = required_string(fields, "category")?;

    if let Some(unknown) = fields
        .keys()
        .find(|key| !KNOWN_FIELDS.contains(&key.as_str()))
    {
        return Err(DomainError::validation(unknown.clone(), "is not allowed"));
    }

    Ok(NewItem {
        name,
        price,
        category,
    })
}

fn required_string(fields: &Map<String, Value>, field: &'static str) -> Result<String, DomainError> {
    match fields.get(field) {
        None => Err(DomainError::validation(field, "is required")),
        Some(Value::String(value)) if value.is_empty() => {
            Err(DomainError::validation(field, "is not allowed to be empty"))
        }
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(DomainError::validation(field, "must be a string")),
    }
}

fn required_price(fields: &Map<String, Value>) -> Result<f64, DomainError> {
    let value = match fields.get("price") {
        None => return Err(DomainError::validation("price", "is required")),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => numeric_text(text),
        Some(_) => None,
    };

    match value {
        Some(price) if !price.is_finite() => {
            Err(DomainError::validation("price", "must be a finite number"))
        }
        Some(price) if price < 0.0 => Err(DomainError::validation(
            "price",
            "must be greater than or equal to 0",
        )),
        Some(price) => Ok(price),
        None => Err(DomainError::validation("price", "must be a number")),
    }
}

/// Numbers sent as text are accepted and converted.
fn numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| !value.is_nan())
}

/// Pick the id for a new item.
///
/// Ids follow the creation timestamp in milliseconds but always move past the
/// largest id already in the collection, which keeps them unique when two
/// creations share a millisecond or the clock steps backwards.
pub fn next_item_id(existing: &[Item], now_millis: u64) -> Result<ItemId, DomainError> {
    let Some(max_existing) = existing.iter().map(|item| item.id).max() else {
        return Ok(now_millis);
    };

    let after_existing = max_existing
        .checked_add(1)
        .ok_or_else(|| DomainError::invariant("item id space exhausted"))?;
    Ok(now_millis.max(after_existing))
}

/// Case-insensitive substring match on the item name.
///
/// `needle` must already be lowercased.
pub fn name_matches(item: &Item, needle: &str) -> bool {
    needle.is_empty() || item.name.to_lowercase().contains(needle)
}
