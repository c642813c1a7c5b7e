use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;

/// JSON request body that tolerates a missing `Content-Type`.
///
/// An explicit non-JSON type (other than curl's form default) is a 415;
/// unparseable bodies are a 400. Both answer `{"error": ...}`.
pub struct JsonBody<T>(pub T);

pub struct BodyRejection {
    status: StatusCode,
    message: String,
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

fn acceptable(content_type: &str) -> bool {
    content_type.starts_with("application/json") || content_type.starts_with("application/x-www-form-urlencoded")
}

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = BodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ct) = req.headers().get(header::CONTENT_TYPE) {
            let ct = ct.to_str().unwrap_or_default().trim().to_ascii_lowercase();
            if !acceptable(&ct) {
                return Err(BodyRejection {
                    status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    message: format!("expected application/json, got {ct}"),
                });
            }
        }
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| BodyRejection { status: e.status(), message: e.body_text() })?;
        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| BodyRejection { status: StatusCode::BAD_REQUEST, message: format!("invalid JSON: {e}") })
    }
}
