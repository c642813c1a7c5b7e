use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use mimicry::nlp::RuleAnalyzer;
use mimicry::{api, AppState, Engine, EngineConfig, PatternDB};

fn app(api_key: Option<&str>) -> Router {
    let db = Arc::new(PatternDB::open(":memory:").unwrap());
    let config = EngineConfig::default().with_seed(1).with_style_rate(0.0);
    let engine = Arc::new(Engine::new(db, Arc::new(RuleAnalyzer::new()), config));
    api::router(AppState { engine, api_key: api_key.map(String::from), started_at: std::time::Instant::now() })
}

async fn json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn converse(body: &str) -> Request<Body> {
    Request::post("/converse")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let resp = app(Some("secret"))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json(resp).await;
    assert_eq!(v["name"], "mimicry");
    assert_eq!(v["mode"], "imitation");
    assert_eq!(v["auth"], true);
}

#[tokio::test]
async fn auth_rejects_missing_and_wrong_tokens() {
    let app = app(Some("secret"));
    let body = r#"{"conversation_id":"c1","text":"hi there"}"#;

    let resp = app.clone().oneshot(converse(body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let mut req = converse(body);
    req.headers_mut().insert("authorization", "Bearer nope".parse().unwrap());
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let mut req = converse(body);
    req.headers_mut().insert("authorization", "Bearer secret".parse().unwrap());
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn first_exchange_falls_back() {
    let resp = app(None)
        .oneshot(converse(r#"{"conversation_id":"c1","text":"Hello there, how are you?"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json(resp).await;
    assert_eq!(v["confidence"], 0.3);
    assert_eq!(v["source"], "fallback");
    assert_eq!(v["emotion"]["primary"], "neutral");
}

#[tokio::test]
async fn bad_bodies_are_rejected() {
    let app = app(None);

    let resp = app.clone().oneshot(converse(r#"{"conversation_id":"c1","text":"   "}"#)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.clone().oneshot(converse(r#"{"conversation_id":"","text":"hello"}"#)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.clone().oneshot(converse("{not json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json(resp).await["error"].is_string());

    let req = Request::post("/converse")
        .header("content-type", "text/xml")
        .body(Body::from("<text/>"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn missing_content_type_is_accepted() {
    let req = Request::post("/converse")
        .body(Body::from(r#"{"conversation_id":"c1","text":"Good morning to you"}"#))
        .unwrap();
    let resp = app(None).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn reporting_endpoints() {
    let app = app(None);
    let resp = app
        .clone()
        .oneshot(converse(r#"{"conversation_id":"c1","text":"My name is Alice. I like cats."}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let get = |path: &str| Request::get(path).body(Body::empty()).unwrap();

    let resp = app.clone().oneshot(get("/conversations/c1/vocabulary")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json(resp).await["total_words"].as_i64().unwrap() > 0);

    let resp = app.clone().oneshot(get("/conversations/c1/patterns")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.clone().oneshot(get("/conversations/c1/facts?tag=name")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let facts = json(resp).await;
    assert_eq!(facts[0]["fact"], "Alice");

    let resp = app.clone().oneshot(get("/conversations/c1/stage")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json(resp).await["stage"].is_string());

    let resp = app.oneshot(get("/conversations/c1/emotions?days=1&limit=3")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json(resp).await;
    assert_eq!(v["recent"].as_array().unwrap().len(), 1);
    assert_eq!(v["timeline"]["timestamps"].as_array().unwrap().len(), 1);
}
