use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dashboard_cell::router::dashboard_routes;
use shared_config::AppConfig;

fn test_config(mock_server: &MockServer) -> AppConfig {
    AppConfig {
        postgrest_url: mock_server.uri(),
        postgrest_api_key: "test-key".to_string(),
    }
}

fn create_test_app(config: AppConfig) -> Router {
    dashboard_routes(Arc::new(config))
}

fn id_rows(count: usize) -> Value {
    let rows: Vec<Value> = (1..=count).map(|id| json!({ "id": id })).collect();
    json!(rows)
}

#[tokio::test]
async fn test_dashboard_stats_counts_each_collection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(id_rows(2)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(id_rows(3)))
        .mount(&mock_server)
        .await;

    // Appointments created today are filtered on created_at, appointments
    // happening today on date; tell the two queries apart by the absent key.
    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param_is_missing("date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(id_rows(1)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param_is_missing("created_at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(id_rows(4)))
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["total_doctors"], 2);
    assert_eq!(json_response["total_patients"], 3);
    assert_eq!(json_response["new_appointments"], 1);
    assert_eq!(json_response["today_appointments"], 4);
}

#[tokio::test]
async fn test_dashboard_stats_storage_failure_returns_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doctors"))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage down"))
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_dashboard_stats_empty_collections() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["total_doctors"], 0);
    assert_eq!(json_response["total_patients"], 0);
}
