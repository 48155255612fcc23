//! Shape checks for inbound payloads.
//!
//! Only presence and type are checked. Every offending field is collected so
//! the client sees all problems in one response.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::structs::{NewPurchase, Page, DEFAULT_LIMIT, DEFAULT_SKIP};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid fields: {}", field_names(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

fn field_names(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|e| e.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validates a creation body. Unknown keys, including `id` and `timestamp`,
/// are ignored.
pub fn new_purchase(body: &Value) -> Result<NewPurchase, ValidationError> {
    let Some(object) = body.as_object() else {
        return Err(ValidationError {
            fields: vec![FieldError::new("body", "must be a JSON object")],
        });
    };

    let mut errors = Vec::new();
    let user_name = required_string(object, "user_name", &mut errors);
    let product = required_string(object, "product", &mut errors);
    let amount = required_number(object, "amount", &mut errors);

    match (user_name, product, amount) {
        (Some(user_name), Some(product), Some(amount)) => Ok(NewPurchase {
            user_name,
            product,
            amount,
        }),
        _ => Err(ValidationError { fields: errors }),
    }
}

/// Validates `skip` and `limit` query parameters, applying defaults.
pub fn page(query: &HashMap<String, String>) -> Result<Page, ValidationError> {
    let mut errors = Vec::new();

    let skip = match query.get("skip") {
        None => Some(DEFAULT_SKIP),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(skip) if skip >= 0 => Some(skip),
            _ => {
                errors.push(FieldError::new("skip", "must be a non-negative integer"));
                None
            }
        },
    };

    let limit = match query.get("limit") {
        None => Some(DEFAULT_LIMIT),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(limit) if limit >= 1 => Some(limit),
            _ => {
                errors.push(FieldError::new("limit", "must be a positive integer"));
                None
            }
        },
    };

    match (skip, limit) {
        (Some(skip), Some(limit)) => Ok(Page { skip, limit }),
        _ => Err(ValidationError { fields: errors }),
    }
}

fn required_string(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(field, "field required"));
            None
        }
        Some(Value::String(value)) if value.is_empty() => {
            errors.push(FieldError::new(field, "must not be empty"));
            None
        }
        Some(Value::String(value)) => Some(value.clone()),
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string"));
            None
        }
    }
}

fn required_number(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    match object.get(field) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(field, "field required"));
            None
        }
        Some(Value::Number(number)) => match number.as_f64() {
            Some(value) if value.is_finite() => Some(value),
            _ => {
                errors.push(FieldError::new(field, "must be a finite number"));
                None
            }
        },
        Some(_) => {
            errors.push(FieldError::new(field, "must be a number"));
            None
        }
    }
}
