use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{AppointmentStatus, AppointmentType, SaveAppointmentRequest};
use appointment_cell::router::appointment_routes;
use shared_config::AppConfig;

fn test_config(mock_server: &MockServer) -> AppConfig {
    AppConfig {
        postgrest_url: mock_server.uri(),
        postgrest_api_key: "test-key".to_string(),
    }
}

fn create_test_app(config: AppConfig) -> Router {
    appointment_routes(Arc::new(config))
}

/// Tomorrow at 10:00 UTC, always in the future.
fn tomorrow_at_ten() -> DateTime<Utc> {
    (Utc::now() + Duration::days(1))
        .date_naive()
        .and_hms_opt(10, 0, 0)
        .unwrap()
        .and_utc()
}

/// Doctor snapshot row with a window covering every day of the week, so the
/// tests do not depend on which weekday they run.
fn doctor_snapshot_row(specialty: &str) -> Value {
    let schedules: Vec<Value> = (0..7)
        .map(|day| {
            json!({
                "day_of_week": day,
                "start_time": "00:00:00",
                "end_time": "23:59:59"
            })
        })
        .collect();

    json!({
        "id": 7,
        "specialty": specialty,
        "schedules": schedules
    })
}

fn appointment_detail_row(id: i64, date: DateTime<Utc>) -> Value {
    json!({
        "id": id,
        "patient_id": 3,
        "doctor_id": 7,
        "date": date.to_rfc3339(),
        "type": "SPECIALIST",
        "status": "SCHEDULED",
        "description": "",
        "notes": "",
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z",
        "patient": { "id": 3, "name": "Agnes Moore" },
        "doctor": { "id": 7, "name": "Dr. Chen", "specialty": "CARDIOLOGY" }
    })
}

fn save_request(date: DateTime<Utc>) -> SaveAppointmentRequest {
    SaveAppointmentRequest {
        patient_id: 3,
        doctor_id: 7,
        date,
        appointment_type: AppointmentType::Specialist,
        status: AppointmentStatus::Scheduled,
        description: Some("Routine check".to_string()),
        notes: None,
    }
}

fn post_json(uri: &str, body: &impl serde::Serialize) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_create_appointment_success() {
    let mock_server = MockServer::start().await;
    let date = tomorrow_at_ten();

    Mock::given(method("GET"))
        .and(path("/doctors"))
        .and(query_param("id", "eq.7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([doctor_snapshot_row("CARDIOLOGY")])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("doctor_id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 1 }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("id", "eq.1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([appointment_detail_row(1, date)])),
        )
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let response = app
        .oneshot(post_json("/", &save_request(date)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["id"], 1);
    assert_eq!(json_response["patient"]["name"], "Agnes Moore");
    assert_eq!(json_response["doctor"]["specialty"], "CARDIOLOGY");
}

#[tokio::test]
async fn test_create_appointment_slot_conflict_returns_422() {
    let mock_server = MockServer::start().await;
    let date = tomorrow_at_ten();

    Mock::given(method("GET"))
        .and(path("/doctors"))
        .and(query_param("id", "eq.7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([doctor_snapshot_row("CARDIOLOGY")])),
        )
        .mount(&mock_server)
        .await;

    // The requested slot is already taken.
    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("doctor_id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 11, "doctor_id": 7, "date": date.to_rfc3339() }
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let response = app
        .oneshot(post_json("/", &save_request(date)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: Value = serde_json::from_slice(&body).unwrap();
    let errors = json_response["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["field"], "date");
    assert_eq!(
        errors[0]["message"],
        "an appointment is already scheduled for this time slot"
    );
}

#[tokio::test]
async fn test_create_appointment_general_doctor_allows_overlap() {
    let mock_server = MockServer::start().await;
    let date = tomorrow_at_ten();

    Mock::given(method("GET"))
        .and(path("/doctors"))
        .and(query_param("id", "eq.7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([doctor_snapshot_row("GENERAL")])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("doctor_id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 11, "doctor_id": 7, "date": date.to_rfc3339() }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 2 }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("id", "eq.2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([appointment_detail_row(2, date)])),
        )
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let response = app
        .oneshot(post_json("/", &save_request(date)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_appointment_past_date_returns_422() {
    let mock_server = MockServer::start().await;
    let date = tomorrow_at_ten() - Duration::days(3);

    Mock::given(method("GET"))
        .and(path("/doctors"))
        .and(query_param("id", "eq.7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([doctor_snapshot_row("CARDIOLOGY")])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("doctor_id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let response = app
        .oneshot(post_json("/", &save_request(date)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: Value = serde_json::from_slice(&body).unwrap();
    let errors = json_response["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["message"], "appointment date cannot be in the past");
}

#[tokio::test]
async fn test_create_appointment_unknown_doctor_skips_validation() {
    let mock_server = MockServer::start().await;
    let date = tomorrow_at_ten();

    // Doctor lookup comes back empty: the rules cannot run yet, so the write
    // goes through.
    Mock::given(method("GET"))
        .and(path("/doctors"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 5 }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("id", "eq.5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([appointment_detail_row(5, date)])),
        )
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let response = app
        .oneshot(post_json("/", &save_request(date)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_update_appointment_does_not_conflict_with_itself() {
    let mock_server = MockServer::start().await;
    let date = tomorrow_at_ten();

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("id", "eq.9"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([appointment_detail_row(9, date)])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/doctors"))
        .and(query_param("id", "eq.7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([doctor_snapshot_row("CARDIOLOGY")])),
        )
        .mount(&mock_server)
        .await;

    // The only booking in the slot is the record being edited.
    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("doctor_id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 9, "doctor_id": 7, "date": date.to_rfc3339() }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 9 }])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let request = Request::builder()
        .method("PUT")
        .uri("/9")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&save_request(date)).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_get_appointment_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("id", "eq.123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let request = Request::builder()
        .method("GET")
        .uri("/123")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["error"], "Appointment not found");
}

#[tokio::test]
async fn test_list_appointments_success() {
    let mock_server = MockServer::start().await;
    let date = tomorrow_at_ten();

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_detail_row(1, date),
            appointment_detail_row(2, date + Duration::hours(1))
        ])))
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
    assert_eq!(json_response.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_upcoming_appointments_success() {
    let mock_server = MockServer::start().await;
    let date = tomorrow_at_ten();

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([appointment_detail_row(1, date)])),
        )
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let request = Request::builder()
        .method("GET")
        .uri("/upcoming")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_appointment_success() {
    let mock_server = MockServer::start().await;
    let date = tomorrow_at_ten();

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("id", "eq.9"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([appointment_detail_row(9, date)])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let app = create_test_app(test_config(&mock_server));
    let request = Request::builder()
        .method("DELETE")
        .uri("/9")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
