//! Integration tests driving the onboarding HTTP API end to end.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use staff_portal::config::PortalConfig;
use staff_portal::onboarding::model::collections;
use staff_portal::onboarding::{MAX_FILE_BYTES, OnboardingDeps, OnboardingRouteState};
use staff_portal::server::build_router;
use staff_portal::store::{Database, LibSqlBackend};
use staff_portal::uploads::LocalFileStore;

const PUBLIC_URL: &str = "http://portal.test/files";
const PHONE: &str = "+919876543210";
const BOUNDARY: &str = "staff-portal-test-boundary";

async fn test_app() -> (Router, TempDir) {
    let (app, _db, dir) = test_app_with_db().await;
    (app, dir)
}

async fn test_app_with_db() -> (Router, Arc<LibSqlBackend>, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = PortalConfig {
        upload_dir: dir.path().to_path_buf(),
        public_url: PUBLIC_URL.to_string(),
        ..PortalConfig::default()
    };
    let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let files = Arc::new(LocalFileStore::new(
        config.upload_dir.clone(),
        config.public_url.clone(),
    ));
    let deps = OnboardingDeps::new(db.clone(), files);
    (build_router(OnboardingRouteState::new(deps), &config), db, dir)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_as(app, Some(PHONE), method, uri, body).await
}

async fn send_as(
    app: &Router,
    phone: Option<&str>,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(phone) = phone {
        builder = builder.header("x-staff-phone", phone);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    read_json(app, request).await
}

async fn read_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn patch(app: &Router, user: &str, step: &str, body: Value) -> (StatusCode, Value) {
    let uri = format!("/api/onboarding/{user}/drafts/{step}");
    send(app, Method::PATCH, &uri, Some(body)).await
}

async fn advance(app: &Router, user: &str) -> (StatusCode, Value) {
    let uri = format!("/api/onboarding/{user}/advance");
    send(app, Method::POST, &uri, None).await
}

/// POST the given `(field, file name, bytes)` parts as a multipart form.
async fn upload(
    app: &Router,
    user: &str,
    step: &str,
    parts: &[(&str, &str, &[u8])],
) -> (StatusCode, Value) {
    let mut body = Vec::new();
    for (field, file_name, content) in parts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::post(format!("/api/onboarding/{user}/drafts/{step}/files"))
        .header("x-staff-phone", PHONE)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    read_json(app, request).await
}

fn pending_file(name: &str, content: &[u8]) -> Value {
    json!({"kind": "pending", "fileName": name, "content": content})
}

fn details_body() -> Value {
    json!({
        "fullName": "Asha Rao",
        "district": "delhi",
        "gender": "female",
        "agency": "zense",
        "dateOfBirth": "1990-01-01",
        "profilePhoto": pending_file("asha.jpg", &[0xff, 0xd8, 0xff]),
    })
}

#[tokio::test]
async fn health_check_returns_ok() {
    let (app, _dir) = test_app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn fresh_session_starts_on_details() {
    let (app, _dir) = test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/onboarding/u1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], "u1");
    assert_eq!(body["currentStep"], "details");
    assert_eq!(body["completed"], false);
    assert_eq!(body["validation"]["canAdvance"], false);
    assert_eq!(body["progress"]["total"], 10);
    assert_eq!(body["record"], json!({}));
}

#[tokio::test]
async fn details_step_saves_and_serves_photo() {
    let (app, _dir) = test_app().await;

    let (status, report) = patch(&app, "u1", "details", details_body()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["canAdvance"], true);

    let (status, body) = advance(&app, "u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentStep"], "address");
    assert_eq!(body["record"]["name"], "Asha Rao");
    assert_eq!(body["record"]["lastStep"], "address");

    let photo = body["record"]["profilePhoto"].as_str().unwrap();
    let served_path = photo.strip_prefix("http://portal.test").unwrap();
    assert!(served_path.starts_with("/files/users/u1/profile/"));

    let response = app
        .clone()
        .oneshot(Request::get(served_path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], &[0xff, 0xd8, 0xff]);
}

#[tokio::test]
async fn incomplete_step_is_rejected_with_missing_fields() {
    let (app, _dir) = test_app().await;
    patch(&app, "u1", "details", json!({"fullName": "Asha Rao"})).await;

    let (status, body) = advance(&app, "u1").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["step"], "details");
    let missing = body["missing"].as_array().unwrap();
    assert!(missing.contains(&json!("district")));
    assert!(missing.contains(&json!("profilePhoto")));
}

#[tokio::test]
async fn draft_requests_are_checked() {
    let (app, _dir) = test_app().await;

    let (status, body) = patch(&app, "u1", "wages", json!({"hours12": 800})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["active"], "details");

    let (status, _) = patch(&app, "u1", "payroll", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = patch(&app, "u1", "details", json!({"subDistricts": "south"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_draft_returns_tagged_draft() {
    let (app, _dir) = test_app().await;
    patch(&app, "u1", "details", json!({"district": "delhi"})).await;

    let (status, body) = send(&app, Method::GET, "/api/onboarding/u1/drafts/details", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "details");
    assert_eq!(body["district"], "delhi");
    assert_eq!(body["profilePhoto"]["kind"], "empty");
}

#[tokio::test]
async fn retreat_moves_back_without_saving() {
    let (app, _dir) = test_app().await;
    patch(&app, "u1", "details", details_body()).await;
    advance(&app, "u1").await;

    let (status, body) = send(&app, Method::POST, "/api/onboarding/u1/retreat", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentStep"], "details");
    assert_eq!(body["record"]["lastStep"], "address");
}

fn onboarding_steps() -> [(&'static str, Value); 9] {
    [
        ("details", details_body()),
        (
            "address",
            json!({
                "currentAddress": {
                    "street": "12 MG Road",
                    "city": "Delhi",
                    "state": "Delhi",
                    "zip": "110001"
                },
                "sameAsCurrent": true
            }),
        ),
        ("wages", json!({"lessThan5Hours": 400, "hours12": 800, "hours24": 1200})),
        (
            "education",
            json!({
                "qualification": "12th",
                "certificate": pending_file("marks.pdf", b"%PDF"),
                "experience": "3",
                "maritalStatus": "single",
                "languages": ["hindi", "english"]
            }),
        ),
        ("shifts", json!({"preferredShifts": ["day", "night"]})),
        ("skills", json!({"jobRole": "attendant", "services": ["cooking"]})),
        (
            "personal",
            json!({"foodPreference": "veg", "smoking": "no", "carryFood": "yes"}),
        ),
        ("testimonial", json!({})),
        (
            "idproof",
            json!({
                "aadharNumber": "123412341234",
                "aadharFront": pending_file("front.jpg", &[1]),
                "aadharBack": pending_file("back.jpg", &[2])
            }),
        ),
    ]
}

async fn complete_onboarding(app: &Router, user: &str) {
    for (step, body) in onboarding_steps() {
        let (status, report) = patch(app, user, step, body).await;
        assert_eq!(status, StatusCode::OK, "{step}: {report}");
        let (status, view) = advance(app, user).await;
        assert_eq!(status, StatusCode::OK, "{step}: {view}");
    }
}

#[tokio::test]
async fn full_onboarding_registers_staff() {
    let (app, _dir) = test_app().await;
    complete_onboarding(&app, "u1").await;

    // The completed session was dropped from memory; this re-hydrates it.
    let (_, body) = send(&app, Method::GET, "/api/onboarding/u1", None).await;
    assert_eq!(body["currentStep"], "completed");
    assert_eq!(body["completed"], true);
    assert_eq!(body["record"]["status"], "registered");
    assert!(body["record"]["permanentAddress"].is_null());
    assert_eq!(body["record"]["expectedWages"]["12hrs"], 800);

    let (status, body) = advance(&app, "u1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "COMPLETED");
}

#[tokio::test]
async fn phone_from_later_request_reaches_identity() {
    let (app, db, _dir) = test_app_with_db().await;

    // First contact without a verified phone caches the session.
    let (status, _) = send_as(&app, None, Method::GET, "/api/onboarding/u1", None).await;
    assert_eq!(status, StatusCode::OK);

    complete_onboarding(&app, "u1").await;

    let user = db
        .get_document(collections::USERS, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user["phone"], PHONE);
    assert_eq!(user["status"], "registered");
}

#[tokio::test]
async fn details_photo_uploads_as_multipart() {
    let (app, _dir) = test_app().await;
    let mut details = details_body();
    details.as_object_mut().unwrap().remove("profilePhoto");
    patch(&app, "u1", "details", details).await;

    let photo = vec![0xab; 1024 * 1024];
    let (status, report) = upload(
        &app,
        "u1",
        "details",
        &[("profilePhoto", "asha.jpg", photo.as_slice())],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["canAdvance"], true);

    let (status, body) = advance(&app, "u1").await;
    assert_eq!(status, StatusCode::OK);
    let url = body["record"]["profilePhoto"].as_str().unwrap();
    let served_path = url.strip_prefix("http://portal.test").unwrap();

    let response = app
        .clone()
        .oneshot(Request::get(served_path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.len(), photo.len());
}

#[tokio::test]
async fn file_uploads_are_checked() {
    let (app, _dir) = test_app().await;

    let oversized = vec![0; MAX_FILE_BYTES + 1];
    let (status, body) = upload(
        &app,
        "u1",
        "details",
        &[("profilePhoto", "big.jpg", oversized.as_slice())],
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "FILE_TOO_LARGE");
    assert_eq!(body["field"], "profilePhoto");

    let (status, body) = upload(&app, "u1", "details", &[("resume", "cv.pdf", &b"%PDF"[..])]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_DRAFT");

    let (status, body) = upload(&app, "u1", "idproof", &[("aadharFront", "f.jpg", &[1u8][..])]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["active"], "details");
}
