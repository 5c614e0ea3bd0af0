use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::CONTENT_TYPE, HeaderMap, Method};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::signal::{self, unix::SignalKind};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::permissions::{role_allows, Capability, Role};
use crate::ratelimit::{RateAction, RateDecision};
use crate::state::AppState;

pub mod error;

mod auth;
mod bookings;
mod conversations;
mod extract;
mod orders;
mod products;
mod questions;
mod reviews;
mod vendors;

pub use error::ApiError;

pub(crate) type ApiResult = ::std::result::Result<Json<Value>, ApiError>;

/// Success envelope: `{"success": true, "<key>": <payload>}`.
pub(crate) fn envelope<T: ::serde::Serialize>(key: &str, value: T) -> Json<Value> {
    Json(::serde_json::json!({ "success": true, key: value }))
}

pub(crate) struct Actor {
    pub id: String,
    pub role: Role,
}

/// Session issuance is out of scope; the caller identifies itself with
/// plain headers and the permission table does the rest.
pub(crate) fn actor(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Forbidden("missing x-user-id header".to_string()))?;

    let role = match headers.get("x-user-role").and_then(|v| v.to_str().ok()) {
        Some("customer") => Role::Customer,
        Some("vendor") => Role::Vendor,
        Some("admin") => Role::Admin,
        Some(other) => {
            return Err(ApiError::BadRequest(format!("unknown role: {}", other)));
        }
        None => return Err(ApiError::Forbidden("missing x-user-role header".to_string())),
    };

    Ok(Actor {
        id: id.to_string(),
        role,
    })
}

pub(crate) fn require(actor: &Actor, capability: Capability) -> Result<(), ApiError> {
    match role_allows(actor.role, capability) {
        true => Ok(()),
        false => Err(ApiError::Forbidden(format!(
            "role does not grant {:?}",
            capability
        ))),
    }
}

pub(crate) fn check_rate(
    state: &AppState,
    identifier: &str,
    action: RateAction,
) -> Result<(), ApiError> {
    match state.limiter.check(identifier, action) {
        RateDecision::Allow => Ok(()),
        RateDecision::Deny { retry_after } => Err(ApiError::RateLimited { retry_after }),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/auth/login", post(auth::login))
        .route(
            "/products",
            get(products::list).post(products::create),
        )
        .route(
            "/products/:id",
            get(products::show)
                .put(products::update)
                .delete(products::archive),
        )
        .route(
            "/products/:id/questions",
            get(questions::list_for_product).post(questions::ask),
        )
        .route("/orders", get(orders::list).post(orders::create))
        .route("/orders/:id", get(orders::show))
        .route("/orders/:id/status", put(orders::update_status))
        .route("/orders/:id/cancel", post(orders::cancel))
        .route("/orders/:id/payment", post(orders::confirm_payment))
        .route(
            "/conversations",
            get(conversations::list).post(conversations::open),
        )
        .route(
            "/conversations/:id/messages",
            get(conversations::list_messages).post(conversations::send_message),
        )
        .route("/conversations/:id/read", post(conversations::mark_read))
        .route("/conversations/:id/status", put(conversations::set_status))
        .route("/reviews", get(reviews::list).post(reviews::submit))
        .route("/reviews/:id/helpful", post(reviews::mark_helpful))
        .route("/bookings", get(bookings::list).post(bookings::create))
        .route("/bookings/:id/schedule", post(bookings::schedule))
        .route("/bookings/:id/status", put(bookings::update_status))
        .route("/bookings/:id/cancel", post(bookings::cancel))
        .route("/bookings/:id/notes", post(bookings::add_note))
        .route("/bookings/:id/rating", post(bookings::rate))
        .route("/questions/:id/replies", post(questions::reply))
        .route("/questions/:id/helpful", post(questions::mark_helpful))
        .route(
            "/vendors/:id/profile",
            get(vendors::show_profile).put(vendors::update_profile),
        )
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>) -> ::anyhow::Result<()> {
    let address = state.config.bind_addr.clone();
    let app = router(state);

    info!("binding to {}", address);
    let listener = TcpListener::bind(&address).await?;
    info!("server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
        info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::handlers::testing::in_memory_handler;
    use crate::ratelimit::RateLimiter;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            handler: in_memory_handler(),
            limiter: RateLimiter::with_defaults(),
            config: Config {
                bind_addr: "127.0.0.1:0".to_string(),
                mongodb_uri: String::new(),
                mongodb_db: String::new(),
                payment_api_base: String::new(),
                payment_secret_key: String::new(),
                public_base_url: String::new(),
            },
        })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        ::serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_sender_role_gets_400_with_failure_envelope() {
        let app = router(test_state());

        let request = Request::builder()
            .method("POST")
            .uri(format!("/conversations/{}/messages", Uuid::new_v4()))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-user-id", "c-1")
            .header("x-user-role", "customer")
            .body(Body::from(r#"{"senderRole":"robot","content":"hi"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Bad Request");
        assert!(body["details"].as_str().unwrap().contains("senderRole"));
        assert!(body.get("success").is_none());
    }

    #[tokio::test]
    async fn missing_body_field_gets_400_with_failure_envelope() {
        let app = router(test_state());

        let request = Request::builder()
            .method("POST")
            .uri("/products")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-user-id", "v-1")
            .header("x-user-role", "vendor")
            .body(Body::from(r#"{"name":"mug"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Bad Request");
        assert!(body["details"].is_string());
    }

    fn login_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"identifier":"bob@example.com"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn sixth_login_attempt_gets_429_with_retry_after() {
        let app = router(test_state());

        for _ in 0..5 {
            let response = app.clone().oneshot(login_request()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.oneshot(login_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .expect("Retry-After header")
            .to_str()
            .unwrap();
        assert_eq!(retry_after, "60");

        let body = body_json(response).await;
        assert_eq!(body["error"], "Too Many Requests");
    }
}
