//! Test helpers.

use std::sync::{Arc, Mutex, MutexGuard};

use actix_web::{
    dev::ServiceResponse,
    test::{self, TestRequest},
    web::{self, Data},
    App,
};
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::PgPool;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres as PostgresImage;

use crate::{
    auth::API_KEY_HEADER,
    config::Config,
    db::{self, PurchaseStore},
    errors::AppError,
    routes,
    structs::{NewPurchase, Page, Purchase},
    AppState,
};

pub(crate) const TEST_API_TOKEN: &str = "test-token";

/// Vec-backed store that assigns ids the way a serial column does.
#[derive(Default)]
pub(crate) struct InMemoryPurchaseStore {
    purchases: Mutex<Vec<Purchase>>,
}

impl InMemoryPurchaseStore {
    fn rows(&self) -> MutexGuard<'_, Vec<Purchase>> {
        self.purchases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn len(&self) -> usize {
        self.rows().len()
    }
}

#[async_trait]
impl PurchaseStore for InMemoryPurchaseStore {
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase, AppError> {
        let mut rows = self.rows();
        let id = i32::try_from(rows.len() + 1).expect("in-memory store exceeded i32 ids");
        let purchase = Purchase {
            id,
            user_name: purchase.user_name,
            product: purchase.product,
            amount: purchase.amount,
            timestamp: Utc::now().trunc_subsecs(6),
        };
        rows.push(purchase.clone());
        Ok(purchase)
    }

    async fn list_purchases(&self, page: Page) -> Result<Vec<Purchase>, AppError> {
        let skip = usize::try_from(page.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        Ok(self.rows().iter().skip(skip).take(limit).cloned().collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub(crate) fn authed(req: TestRequest) -> TestRequest {
    req.insert_header((API_KEY_HEADER, TEST_API_TOKEN))
}

/// Builds the full app around `store` and sends one request through it.
pub(crate) async fn send(store: Arc<dyn PurchaseStore>, req: TestRequest) -> ServiceResponse {
    let state = Data::new(AppState { store });
    let app = test::init_service(
        App::new()
            .configure(routes::configure(state, Arc::from(TEST_API_TOKEN)))
            .default_service(web::to(routes::default_handler)),
    )
    .await;

    test::call_service(&app, req.to_request()).await
}

const TEST_DB_USER: &str = "postpago_test";
const TEST_DB_PASSWORD: &str = "postpago_test_password";
const TEST_DB_NAME: &str = "postpago_test";

/// A throwaway PostgreSQL container and a pool connected to it. The container
/// is removed when this is dropped.
pub(crate) struct TestDatabase {
    pub(crate) pool: PgPool,
    _container: ContainerAsync<PostgresImage>,
}

/// Starts a fresh PostgreSQL container and connects through [`db::connect`],
/// so every test sees an empty database with no schema yet.
pub(crate) async fn start_postgres() -> TestDatabase {
    let container = PostgresImage::default()
        .with_user(TEST_DB_USER)
        .with_password(TEST_DB_PASSWORD)
        .with_db_name(TEST_DB_NAME)
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get container port");
    let host =
        std::env::var("TESTCONTAINERS_HOST_OVERRIDE").unwrap_or_else(|_| "localhost".to_string());

    let config = Config {
        db_user: TEST_DB_USER.to_string(),
        db_password: TEST_DB_PASSWORD.to_string(),
        db_host: host,
        db_port: port,
        db_name: TEST_DB_NAME.to_string(),
        api_token: TEST_API_TOKEN.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        db_max_connections: 2,
        db_timeout_secs: 10,
    };
    let pool = db::connect(&config)
        .await
        .expect("Failed to connect to PostgreSQL container");

    TestDatabase {
        pool,
        _container: container,
    }
}
