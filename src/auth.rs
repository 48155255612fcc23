//! Shared-secret header check for the versioned API.

use std::{
    future::{ready, Future, Ready},
    pin::Pin,
    rc::Rc,
    sync::Arc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::HeaderValue,
    Error, HttpResponse,
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Exact, case-sensitive comparison in constant time for equal-length keys.
/// Missing and wrong keys are not distinguished.
pub fn verify_api_key(provided: Option<&HeaderValue>, expected: &str) -> bool {
    provided.is_some_and(|value| value.as_bytes().ct_eq(expected.as_bytes()).into())
}

/// Middleware rejecting requests whose `x-api-key` header does not match the
/// configured token. Runs before any extractor of the wrapped handlers.
#[derive(Clone)]
pub struct ApiKeyAuth {
    token: Arc<str>,
}

impl ApiKeyAuth {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ApiKeyAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyAuthMiddleware {
            service: Rc::new(service),
            token: Arc::clone(&self.token),
        }))
    }
}

pub struct ApiKeyAuthMiddleware<S> {
    service: Rc<S>,
    token: Arc<str>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !verify_api_key(req.headers().get(API_KEY_HEADER), &self.token) {
            log::warn!(
                "Rejected unauthenticated {} {} from {}",
                req.method(),
                req.path(),
                req.connection_info().realip_remote_addr().unwrap_or("unknown")
            );
            let response = HttpResponse::from_error(AppError::Unauthorized).map_into_right_body();
            return Box::pin(async move { Ok(req.into_response(response)) });
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{
        http::StatusCode,
        test::{self, TestRequest},
        web, App, HttpResponse,
    };
    use serde_json::{json, Value};

    use super::*;

    const TOKEN: &str = "test-token";

    async fn protected() -> HttpResponse {
        HttpResponse::Ok().body("secret")
    }

    #[test]
    fn verify_requires_exact_match() {
        let expected = "Abc123";

        assert!(verify_api_key(Some(&HeaderValue::from_static("Abc123")), expected));
        assert!(!verify_api_key(Some(&HeaderValue::from_static("abc123")), expected));
        assert!(!verify_api_key(Some(&HeaderValue::from_static("Abc123 ")), expected));
        assert!(!verify_api_key(Some(&HeaderValue::from_static("")), expected));
        assert!(!verify_api_key(Some(&HeaderValue::from_static("Abc12")), expected));
        assert!(!verify_api_key(Some(&HeaderValue::from_static("Abc1234")), expected));
        assert!(!verify_api_key(None, expected));
    }

    #[actix_web::test]
    async fn correct_key_passes_through() {
        let app = test::init_service(
            App::new()
                .wrap(ApiKeyAuth::new(TOKEN))
                .route("/", web::get().to(protected)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/")
            .insert_header((API_KEY_HEADER, TOKEN))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, "secret");
    }

    #[actix_web::test]
    async fn header_name_is_case_insensitive() {
        let app = test::init_service(
            App::new()
                .wrap(ApiKeyAuth::new(TOKEN))
                .route("/", web::get().to(protected)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/")
            .insert_header(("X-API-Key", TOKEN))
            .to_request();

        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn missing_and_wrong_keys_look_the_same() {
        let app = test::init_service(
            App::new()
                .wrap(ApiKeyAuth::new(TOKEN))
                .route("/", web::get().to(protected)),
        )
        .await;

        let missing = test::call_service(&app, TestRequest::get().uri("/").to_request()).await;
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        let missing: Value = test::read_body_json(missing).await;

        let wrong = test::call_service(
            &app,
            TestRequest::get()
                .uri("/")
                .insert_header((API_KEY_HEADER, "TEST-TOKEN"))
                .to_request(),
        )
        .await;
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        let wrong: Value = test::read_body_json(wrong).await;

        assert_eq!(missing, json!({ "error": "unauthorized" }));
        assert_eq!(missing, wrong);
    }
}
