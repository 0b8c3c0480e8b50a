use actix_web::http::header::CONTENT_TYPE;
use actix_web::http::StatusCode;
use actix_web::test;
use employee_api::routes::health::BANNER;
use employee_api::state::app_state::AppState;
use serde_json::Value;

use crate::support::{build_test_state, create_test_app};

#[actix_web::test]
async fn root_serves_banner() {
    let app = create_test_app(AppState::without_db()).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"), "{content_type}");
    assert!(resp.headers().contains_key("x-trace-id"));

    let body = test::read_body(resp).await;
    assert_eq!(body, BANNER.as_bytes());
}

#[actix_web::test]
async fn health_without_database_reports_unavailable() {
    let app = create_test_app(AppState::without_db()).await;

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "unavailable");
    assert_eq!(body["migrations"], "unknown");
    assert!(body["db_error"].is_string());
    assert!(body["app_version"].is_string());
    assert!(body["time"].is_string());
}

#[actix_web::test]
async fn health_with_database_reports_latest_migration() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let app = create_test_app(state).await;

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["db"], "ok");
    assert!(body.get("db_error").is_none());
    assert_eq!(body["migrations"], "m20251018_000001_create_employees");
    Ok(())
}
