use std::{collections::HashMap, sync::Arc};

use actix_web::{
    get,
    http::Method,
    web::{self, Data},
    HttpResponse, Responder,
};
use serde_json::Value;
use utoipa::OpenApi;

use crate::{
    auth::ApiKeyAuth,
    errors::AppError,
    openapi::{ApiDoc, OPENAPI_PATH},
    structs::{HealthResponse, NewPurchase, PurchaseResponse, WelcomeResponse},
    validation, AppState,
};

pub const WELCOME_MESSAGE: &str =
    "Welcome to the Postpago public API. Purchases live under /v1/purchases/ and require the x-api-key header. The OpenAPI document is at /v1/openapi.json.";

/// Registers every route. The `/v1` scope sits behind [`ApiKeyAuth`]; the
/// OpenAPI document is registered ahead of it so it stays public.
pub fn configure(
    state: Data<AppState>,
    api_token: Arc<str>,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(state)
            .app_data(
                web::JsonConfig::default()
                    .content_type_required(false)
                    .error_handler(|err, _req| {
                        AppError::BadRequest(format!("invalid JSON body: {}", err)).into()
                    }),
            )
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                AppError::BadRequest(format!("invalid query string: {}", err)).into()
            }))
            .service(index_handler)
            .service(health_handler)
            .service(web::resource(OPENAPI_PATH).route(web::get().to(openapi_handler)))
            .service(
                web::scope("/v1").wrap(ApiKeyAuth::new(api_token)).service(
                    web::resource(["/purchases", "/purchases/"])
                        .route(web::post().to(create_purchase_handler))
                        .route(web::get().to(list_purchases_handler))
                        .default_service(web::to(method_not_allowed_handler)),
                ),
            );
    }
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Welcome message", body = WelcomeResponse))
)]
#[get("/")]
pub async fn index_handler() -> impl Responder {
    HttpResponse::Ok().json(WelcomeResponse {
        message: WELCOME_MESSAGE.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Store reachable", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health_handler(state: Data<AppState>) -> impl Responder {
    match state.store.ping().await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: "ok".to_string(),
        }),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "unavailable".to_string(),
            })
        }
    }
}

/// Create purchase handler
#[utoipa::path(
    post,
    path = "/v1/purchases/",
    request_body = NewPurchase,
    responses(
        (status = 201, description = "Purchase stored", body = PurchaseResponse),
        (status = 400, description = "Body is not JSON"),
        (status = 401, description = "Missing or wrong x-api-key"),
        (status = 422, description = "Missing or mistyped fields"),
        (status = 500, description = "Storage failure")
    ),
    security(("api_key" = []))
)]
pub async fn create_purchase_handler(
    state: Data<AppState>,
    body: web::Json<Value>,
) -> Result<impl Responder, AppError> {
    let new_purchase = validation::new_purchase(&body).map_err(|e| {
        log::info!("Rejected purchase: {}", e);
        e
    })?;

    let purchase = state.store.create_purchase(new_purchase).await?;

    Ok(HttpResponse::Created().json(PurchaseResponse::from(purchase)))
}

/// List purchases handler
#[utoipa::path(
    get,
    path = "/v1/purchases/",
    params(
        ("skip" = Option<i64>, Query, description = "Rows to skip, default 0"),
        ("limit" = Option<i64>, Query, description = "Maximum rows, default 50")
    ),
    responses(
        (status = 200, description = "Purchases in creation order", body = [PurchaseResponse]),
        (status = 401, description = "Missing or wrong x-api-key"),
        (status = 422, description = "Invalid pagination"),
        (status = 500, description = "Storage failure")
    ),
    security(("api_key" = []))
)]
pub async fn list_purchases_handler(
    state: Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<impl Responder, AppError> {
    let page = validation::page(&query)?;

    let purchases: Vec<PurchaseResponse> = state
        .store
        .list_purchases(page)
        .await?
        .into_iter()
        .map(PurchaseResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(purchases))
}

pub async fn openapi_handler() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Fallback for methods a known resource does not route, `HEAD` included.
pub async fn method_not_allowed_handler() -> Result<HttpResponse, AppError> {
    Err(AppError::MethodNotAllowed)
}

pub async fn default_handler(req_method: Method) -> Result<HttpResponse, AppError> {
    match req_method {
        Method::GET | Method::HEAD => Err(AppError::NotFound),
        _ => Err(AppError::MethodNotAllowed),
    }
}
