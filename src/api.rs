//! HTTP API for AnonID
//!
//! ## Endpoint Map
//!
//! | Method | Path                           | Description                       |
//! |--------|--------------------------------|-----------------------------------|
//! | GET    | `/health`                      | Liveness check                    |
//! | POST   | `/api/v1/register`             | Register an identity by NIN       |
//! | POST   | `/api/v1/verify`               | Public view, optional risk check  |
//! | POST   | `/api/v1/access`               | Risk-gated field disclosure       |
//! | GET    | `/api/v1/users/:anon_id`       | Public profile                    |
//! | POST   | `/api/v1/privacy/check`        | Score one request                 |
//! | POST   | `/api/v1/privacy/batch`        | Score several requests            |
//! | GET    | `/api/v1/privacy/methodology`  | Weights and thresholds            |
//! | GET    | `/api/v1/stats`                | Registration and access counters  |

use crate::error::AnonIdError;
use crate::privacy::DisclosureRequest;
use crate::service::AnonIdService;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for all handlers
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<AnonIdService>,
}

/// Build the complete AnonID HTTP application
pub fn build_app(service: Arc<AnonIdService>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/register", post(register))
        .route("/api/v1/verify", post(verify))
        .route("/api/v1/access", post(access))
        .route("/api/v1/users/:anon_id", get(user_profile))
        .route("/api/v1/privacy/check", post(check_privacy))
        .route("/api/v1/privacy/batch", post(batch_check))
        .route("/api/v1/privacy/methodology", get(methodology))
        .route("/api/v1/stats", get(stats))
        .with_state(ApiState { service })
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(cors_origins))
}

impl IntoResponse for AnonIdError {
    fn into_response(self) -> Response {
        let status = match &self {
            AnonIdError::NotFound(_) => StatusCode::NOT_FOUND,
            AnonIdError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(code = self.code(), "Request failed: {}", self);
        }
        let body = serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AnonIdError {
    fn from(rejection: JsonRejection) -> Self {
        AnonIdError::Validation(rejection.body_text())
    }
}

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub nin: String,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub nin: String,
    #[serde(default)]
    pub verification_request: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub nin: String,
    #[serde(flatten)]
    pub request: DisclosureRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub request_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub requests: Vec<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

// =============================================================================
// Handlers
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "anonid".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn register(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AnonIdError> {
    let Json(req) = payload?;
    let registration = state.service.register(&req.nin, req.refresh).await?;
    Ok(Json(registration))
}

async fn verify(
    State(state): State<ApiState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AnonIdError> {
    let Json(req) = payload?;
    let verification = state
        .service
        .verify(&req.nin, req.verification_request.as_deref())
        .await?;
    Ok(Json(verification))
}

async fn access(
    State(state): State<ApiState>,
    payload: Result<Json<AccessRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AnonIdError> {
    let Json(req) = payload?;
    let disclosure = state.service.access(&req.nin, &req.request).await?;
    let status = if disclosure.granted {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };
    Ok((status, Json(disclosure)))
}

async fn user_profile(
    State(state): State<ApiState>,
    Path(anon_id): Path<String>,
) -> Result<impl IntoResponse, AnonIdError> {
    Ok(Json(state.service.profile(&anon_id).await?))
}

async fn check_privacy(
    State(state): State<ApiState>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AnonIdError> {
    let Json(req) = payload?;
    Ok(Json(state.service.check_risk(&req.request_text)?))
}

async fn batch_check(
    State(state): State<ApiState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AnonIdError> {
    let Json(req) = payload?;
    Ok(Json(state.service.batch_check(&req.requests)?))
}

async fn methodology(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.service.methodology())
}

async fn stats(State(state): State<ApiState>) -> Result<impl IntoResponse, AnonIdError> {
    Ok(Json(state.service.stats().await?))
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let resp = health_check().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AnonIdError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AnonIdError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                AnonIdError::Decryption("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AnonIdError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_json_rejection_becomes_validation_error() {
        use axum::body::Body;
        use axum::http::Request;
        use axum::extract::FromRequest;

        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let rejection = Json::<RegisterRequest>::from_request(req, &())
            .await
            .unwrap_err();
        let err = AnonIdError::from(rejection);
        assert!(matches!(err, AnonIdError::Validation(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_access_request_flattens_disclosure() {
        let req: AccessRequest = serde_json::from_str(
            r#"{"nin":"12345678901","requestedFields":["gender"],"requestText":"Verify age"}"#,
        )
        .unwrap();
        assert_eq!(req.nin, "12345678901");
        assert_eq!(req.request.requested_fields, vec!["gender"]);
        assert_eq!(req.request.request_text.as_deref(), Some("Verify age"));
    }
}
