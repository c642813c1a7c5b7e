use axum::extract::State;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use subtle::ConstantTimeEq;
use tower_http::limit::RequestBodyLimitLayer;

use crate::error::MimicError;
use crate::AppState;

mod body;
mod conversations;

use conversations::*;

pub use body::JsonBody;

const BODY_LIMIT: usize = 64 * 1024;

/// Bearer auth, only when an API key is configured.
async fn require_auth(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, MimicError> {
    let Some(ref expected) = state.api_key else {
        return Ok(next.run(req).await);
    };

    let token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(MimicError::Unauthorized)?;

    if token.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(next.run(req).await)
    } else {
        tracing::warn!("rejected request with bad token");
        Err(MimicError::Unauthorized)
    }
}

pub fn router(state: AppState) -> Router {
    let public = Router::new().route("/health", get(health));

    let protected = Router::new()
        .route("/converse", post(converse))
        .route("/conversations/{id}/vocabulary", get(vocabulary))
        .route("/conversations/{id}/patterns", get(patterns))
        .route("/conversations/{id}/facts", get(facts))
        .route("/conversations/{id}/stage", get(stage))
        .route("/conversations/{id}/emotions", get(emotions))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public.merge(protected).layer(RequestBodyLimitLayer::new(BODY_LIMIT)).with_state(state)
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "mimicry",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "mode": state.engine.config().mode,
        "auth": state.api_key.is_some(),
    }))
}
