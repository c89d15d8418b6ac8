//! Shared test harness: a local mock of the tenet API plus client builders.
//!
//! The mock keeps per-endpoint call counters and a rotating token
//! generation so tests can assert exactly how many refreshes happened and
//! which pair the client ended up holding.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use tenet_core::auth::credentials::{Credential, CredentialStore, MemoryStore, StoreError};
use tenet_core::models::UserProfile;
use tenet_core::{ApiClient, AuthService};

/// The verification code the mock accepts (single-use).
#[allow(dead_code)]
pub const VALID_CODE: &str = "111111";

/// Default request timeout for tests; short enough to keep failures fast.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
pub struct MockState {
    pub refresh_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub fail_refresh: AtomicBool,
    pub fail_logout: AtomicBool,
    /// Token generation; each successful refresh rotates it
    pub generation: AtomicUsize,
    pub used_codes: Mutex<HashSet<String>>,
}

impl MockState {
    pub fn access_token(&self) -> String {
        format!("access-{}", self.generation.load(Ordering::SeqCst))
    }

    pub fn refresh_token(&self) -> String {
        format!("refresh-{}", self.generation.load(Ordering::SeqCst))
    }
}

pub struct MockApi {
    pub state: Arc<MockState>,
    pub base_url: String,
}

pub async fn spawn_mock_api() -> MockApi {
    let state = Arc::new(MockState::default());

    let app = Router::new()
        .route("/auth/request-code", post(request_code))
        .route("/auth/login", post(request_code))
        .route("/auth/verify-code", post(verify_code))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/principles", get(list_principles))
        .route("/principles/{id}/agree", post(agree))
        .route(
            "/principles/country-agreement-percentages",
            get(country_percentages),
        )
        .route("/countries", get(countries))
        .route("/countries/detect", get(detect_country))
        .route("/envelope-error", get(envelope_error))
        .route("/slow", get(slow))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock API listener");
    let addr = listener.local_addr().expect("mock API address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock API serve");
    });

    MockApi {
        state,
        base_url: format!("http://{}", addr),
    }
}

/// Build a gateway plus its in-memory store against the given base URL.
pub fn test_client(base_url: &str) -> (Arc<ApiClient>, Arc<MemoryStore>) {
    test_client_with_timeout(base_url, TEST_TIMEOUT)
}

#[allow(dead_code)]
pub fn test_client_with_timeout(
    base_url: &str,
    timeout: Duration,
) -> (Arc<ApiClient>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let api = ApiClient::new(base_url, timeout, store.clone() as Arc<dyn CredentialStore>)
        .expect("Failed to build test client");
    (Arc::new(api), store)
}

/// Build the full auth stack against the given base URL.
#[allow(dead_code)]
pub fn test_auth(base_url: &str) -> (AuthService, Arc<ApiClient>, Arc<MemoryStore>) {
    let (api, store) = test_client(base_url);
    (AuthService::new(api.clone()), api, store)
}

#[allow(dead_code)]
pub fn sample_user() -> UserProfile {
    serde_json::from_value(sample_user_json()).expect("parse sample user")
}

pub fn sample_user_json() -> Value {
    json!({
        "id": "665f1c2a9b3e4d0012a7c001",
        "email": "ada@example.org",
        "name": "Ada",
        "birthYear": 1990,
        "country": "GB",
        "isVerified": true,
        "isAdmin": false,
        "createdAt": "2026-01-15T09:30:00Z"
    })
}

#[allow(dead_code)]
#[allow(dead_code)]
pub fn credential(access: &str, refresh: &str) -> Credential {
    Credential {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
    }
}

/// A store whose writes always fail, for persist-failure paths.
#[allow(dead_code)]
pub struct FailingStore;

impl CredentialStore for FailingStore {
    fn credential(&self) -> Option<Credential> {
        None
    }

    fn set_credential(&self, _credential: &Credential) -> Result<(), StoreError> {
        Err(StoreError::Keychain("keychain is locked".to_string()))
    }

    fn user(&self) -> Option<UserProfile> {
        None
    }

    fn set_user(&self, _user: &UserProfile) -> Result<(), StoreError> {
        Err(StoreError::Keychain("keychain is locked".to_string()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn envelope(data: Value) -> Json<Value> {
    Json(json!({ "status": "success", "data": data }))
}

fn error_envelope(message: &str) -> Json<Value> {
    Json(json!({ "status": "error", "message": message }))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

async fn request_code(Json(body): Json<Value>) -> Json<Value> {
    envelope(json!({
        "email": body["email"],
        "isNewUser": body.get("name").is_some(),
        "bypass": true,
    }))
}

async fn verify_code(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let code = body["code"].as_str().unwrap_or_default().to_string();
    if code != VALID_CODE {
        return (
            StatusCode::BAD_REQUEST,
            error_envelope("Invalid verification code"),
        );
    }

    let mut used = state.used_codes.lock().expect("used_codes lock");
    if !used.insert(code) {
        return (
            StatusCode::UNAUTHORIZED,
            error_envelope("Code already used"),
        );
    }

    (
        StatusCode::OK,
        envelope(json!({
            "user": sample_user_json(),
            "accessToken": state.access_token(),
            "refreshToken": state.refresh_token(),
        })),
    )
}

async fn refresh(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    if state.fail_refresh.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            error_envelope("Refresh token revoked"),
        );
    }

    if body["refreshToken"].as_str() != Some(state.refresh_token().as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            error_envelope("Unknown refresh token"),
        );
    }

    state.generation.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        envelope(json!({
            "accessToken": state.access_token(),
            "refreshToken": state.refresh_token(),
        })),
    )
}

async fn me(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.me_calls.fetch_add(1, Ordering::SeqCst);

    if bearer(&headers) != Some(state.access_token().as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            error_envelope("Invalid access token"),
        );
    }

    (StatusCode::OK, envelope(json!({ "user": sample_user_json() })))
}

async fn logout(State(state): State<Arc<MockState>>) -> (StatusCode, Json<Value>) {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);

    if state.fail_logout.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_envelope("Logout backend unavailable"),
        );
    }

    (StatusCode::OK, Json(json!({ "status": "success" })))
}

async fn list_principles() -> Json<Value> {
    envelope(json!({
        "principles": [{
            "_id": "665f1c2a9b3e4d0012a7c101",
            "text": "Listen before you answer.",
            "createdBy": "665f1c2a9b3e4d0012a7c001",
            "agreementCount": 42,
            "userAgreed": false,
            "createdAt": "2026-03-10T12:00:00Z"
        }],
        "pagination": { "page": 1, "limit": 20, "total": 1, "pages": 1 }
    }))
}

async fn agree(axum::extract::Path(id): axum::extract::Path<String>) -> Json<Value> {
    envelope(json!({
        "principleId": id,
        "agreementCount": 43,
        "userAgreed": true,
    }))
}

async fn country_percentages() -> Json<Value> {
    envelope(json!({
        "countries": [
            { "country": { "_id": "c1", "name": "United Kingdom", "code": "GB" }, "percentage": 62.5 },
            { "country": { "_id": "c2", "name": "Japan", "code": "JP" }, "percentage": 18.0 }
        ]
    }))
}

async fn countries() -> Json<Value> {
    envelope(json!({
        "countries": [
            { "_id": "c1", "name": "United Kingdom", "code": "GB" },
            { "_id": "c2", "name": "Japan", "code": "JP" }
        ]
    }))
}

async fn detect_country() -> Json<Value> {
    envelope(json!({
        "country": { "_id": "c1", "name": "United Kingdom", "code": "GB" },
        "detected": true,
        "message": null
    }))
}

async fn envelope_error() -> Json<Value> {
    error_envelope("Backend exploded")
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    envelope(json!({ "ok": true }))
}
