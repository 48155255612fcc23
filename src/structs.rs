use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

pub const DEFAULT_SKIP: i64 = 0;
pub const DEFAULT_LIMIT: i64 = 50;

/// A stored purchase row.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Purchase {
    pub id: i32,
    pub user_name: String,
    pub product: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// A purchase that passed validation and is ready to be inserted.
#[derive(Debug, Clone, PartialEq, ToSchema)]
pub struct NewPurchase {
    pub user_name: String,
    pub product: String,
    pub amount: f64,
}

/// Offset pagination for listing purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: DEFAULT_SKIP,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Wire form of a purchase.
///
/// `timestamp` is RFC 3339 in UTC with microsecond precision, which is the
/// precision PostgreSQL keeps, so the string parses back to the stored value.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct PurchaseResponse {
    pub id: i32,
    pub user_name: String,
    pub product: String,
    pub amount: f64,
    #[schema(example = "2025-01-31T12:00:00.123456Z")]
    pub timestamp: String,
}

impl From<Purchase> for PurchaseResponse {
    fn from(purchase: Purchase) -> Self {
        Self {
            id: purchase.id,
            user_name: purchase.user_name,
            product: purchase.product,
            amount: purchase.amount,
            timestamp: format_timestamp(&purchase.timestamp),
        }
    }
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
