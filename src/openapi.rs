//! OpenAPI document for the public endpoints.

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    auth::API_KEY_HEADER,
    routes,
    structs::{HealthResponse, NewPurchase, PurchaseResponse, WelcomeResponse},
};

pub const OPENAPI_PATH: &str = "/v1/openapi.json";

pub const SECURITY_SCHEME: &str = "api_key";

#[derive(OpenApi)]
#[openapi(
    info(title = "Postpago public API"),
    paths(
        routes::index_handler,
        routes::health_handler,
        routes::create_purchase_handler,
        routes::list_purchases_handler
    ),
    components(schemas(NewPurchase, PurchaseResponse, WelcomeResponse, HealthResponse)),
    modifiers(&ApiKeyScheme)
)]
pub struct ApiDoc;

struct ApiKeyScheme;

impl Modify for ApiKeyScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                SECURITY_SCHEME,
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}
