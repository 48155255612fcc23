use std::time::Duration;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
#[cfg(test)]
use mockall::automock;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use crate::{
    config::Config,
    errors::AppError,
    structs::{NewPurchase, Page, Purchase},
};

const SCHEMA_SQL: &str = include_str!("sql/schema.sql");

const INSERT_PURCHASE_SQL: &str = r#"
    INSERT INTO purchases (user_name, product, amount, "timestamp")
    VALUES ($1, $2, $3, $4)
    RETURNING id, user_name, product, amount, "timestamp"
"#;

const LIST_PURCHASES_SQL: &str = r#"
    SELECT id, user_name, product, amount, "timestamp"
    FROM purchases
    ORDER BY id ASC
    OFFSET $1
    LIMIT $2
"#;

/// Persistence for purchase records.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Inserts a purchase stamped with the server clock and returns the stored row.
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase, AppError>;

    /// Lists purchases in insertion (id) order.
    async fn list_purchases(&self, page: Page) -> Result<Vec<Purchase>, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct PgPurchaseStore {
    pool: PgPool,
}

impl PgPurchaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseStore for PgPurchaseStore {
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase, AppError> {
        // postgres keeps microseconds; truncate so the returned row is exactly what was written
        let timestamp = Utc::now().trunc_subsecs(6);

        let mut conn = self.pool.acquire().await.map_err(|e| {
            log::error!("Failed to acquire database connection: {}", e);
            AppError::Storage(e)
        })?;

        let purchase = sqlx::query_as::<_, Purchase>(INSERT_PURCHASE_SQL)
            .bind(purchase.user_name)
            .bind(purchase.product)
            .bind(purchase.amount)
            .bind(timestamp)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                log::error!("Failed to insert purchase: {}", e);
                AppError::Storage(e)
            })?;

        log::info!(
            "Purchase created: id={} user_name={}",
            purchase.id,
            purchase.user_name
        );
        Ok(purchase)
    }

    async fn list_purchases(&self, page: Page) -> Result<Vec<Purchase>, AppError> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            log::error!("Failed to acquire database connection: {}", e);
            AppError::Storage(e)
        })?;

        let purchases = sqlx::query_as::<_, Purchase>(LIST_PURCHASES_SQL)
            .bind(page.skip)
            .bind(page.limit)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| {
                log::error!("Failed to list purchases: {}", e);
                AppError::Storage(e)
            })?;

        log::debug!(
            "Listed {} purchases (skip={}, limit={})",
            purchases.len(),
            page.skip,
            page.limit
        );
        Ok(purchases)
    }

    async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }
}

/// Opens the pool eagerly so an unreachable database fails startup.
pub async fn connect(config: &Config) -> Result<PgPool, AppError> {
    let timeout = config.db_timeout();
    let statement_timeout = format!("{}ms", timeout.as_millis());
    let options: PgConnectOptions = config
        .connect_options()
        .options([("statement_timeout", statement_timeout.as_str())]);

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(timeout)
        .idle_timeout(Some(Duration::from_secs(600)))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Creates the purchases table and its index if they are missing.
pub async fn init_schema(pool: &PgPool) -> Result<(), AppError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}
