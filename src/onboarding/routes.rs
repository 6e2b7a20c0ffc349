//! REST endpoints that let a UI drive one onboarding controller per user.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use super::controller::{OnboardingController, OnboardingDeps, Progress, StaffAccount};
use super::draft::{MAX_FILE_BYTES, StepDraft};
use super::merge::Fields;
use super::state::{StepId, UnknownStep};
use super::validator::ValidationReport;
use crate::error::OnboardingError;

/// Header carrying the verified phone number from the auth layer.
pub const PHONE_HEADER: &str = "x-staff-phone";

/// Body limit for file uploads: every file field of the largest step at the
/// per-file cap, plus room for multipart framing. Oversized single files
/// still reach the handler and get a precise error.
pub const MAX_UPLOAD_BODY: usize = 3 * MAX_FILE_BYTES + 1024 * 1024;

type SharedController = Arc<Mutex<OnboardingController>>;

struct SessionEntry {
    controller: SharedController,
    /// Milliseconds since the registry started.
    last_seen: AtomicU64,
}

/// Live controllers, one per user id.
///
/// A user's controller is hydrated on first access and reused afterwards;
/// its mutex serializes that user's requests. Completed and idle sessions
/// are dropped; the store holds everything needed to resume them.
pub struct SessionRegistry {
    deps: OnboardingDeps,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    started: Instant,
}

impl SessionRegistry {
    pub fn new(deps: OnboardingDeps) -> Self {
        Self {
            deps,
            sessions: RwLock::new(HashMap::new()),
            started: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Get the user's controller, hydrating it from the store if needed.
    ///
    /// A non-empty phone on `account` replaces the one the session holds.
    pub async fn session(
        &self,
        account: StaffAccount,
    ) -> Result<SharedController, OnboardingError> {
        let cached = self.sessions.read().await.get(&account.user_id).map(|entry| {
            entry.last_seen.store(self.now_ms(), Ordering::Relaxed);
            Arc::clone(&entry.controller)
        });

        if let Some(controller) = cached {
            if !account.phone.is_empty() {
                controller.lock().await.refresh_phone(&account.phone);
            }
            return Ok(controller);
        }

        let user_id = account.user_id.clone();
        let controller = OnboardingController::hydrate(self.deps.clone(), account).await?;

        // Another request may have hydrated the same user meanwhile; keep theirs.
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(user_id).or_insert_with(|| SessionEntry {
            controller: Arc::new(Mutex::new(controller)),
            last_seen: AtomicU64::new(0),
        });
        entry.last_seen.store(self.now_ms(), Ordering::Relaxed);
        Ok(Arc::clone(&entry.controller))
    }

    /// Drop a user's session so the next request re-hydrates.
    pub async fn evict(&self, user_id: &str) -> bool {
        self.sessions.write().await.remove(user_id).is_some()
    }

    /// Drop sessions untouched for at least `max_idle`.
    ///
    /// A session whose controller is busy (an advance in flight) is kept.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.now_ms();
        let max_idle = u64::try_from(max_idle.as_millis()).unwrap_or(u64::MAX);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            let idle = now.saturating_sub(entry.last_seen.load(Ordering::Relaxed));
            idle < max_idle || entry.controller.try_lock().is_err()
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Spawn the idle-session sweep (runs every 60s).
pub fn spawn_idle_sweep(
    sessions: Arc<SessionRegistry>,
    max_idle: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let evicted = sessions.evict_idle(max_idle).await;
            if evicted > 0 {
                let remaining = sessions.len().await;
                debug!(evicted, remaining, "Idle sessions dropped");
            }
        }
    })
}

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub sessions: Arc<SessionRegistry>,
}

impl OnboardingRouteState {
    pub fn new(deps: OnboardingDeps) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(deps)),
        }
    }
}

// ── Errors ──────────────────────────────────────────────────────────

/// Handler error, rendered as a JSON body with a matching status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Onboarding(#[from] OnboardingError),

    #[error(transparent)]
    UnknownStep(#[from] UnknownStep),

    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match &self {
            ApiError::Onboarding(err) => match err {
                OnboardingError::Validation(v) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({
                        "error": message,
                        "code": "VALIDATION_ERROR",
                        "step": v.step,
                        "missing": v.missing,
                    }),
                ),
                OnboardingError::Persistence(_) | OnboardingError::Upload(_) => {
                    error!(error = %err, "Onboarding write failed");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        json!({
                            "error": message,
                            "code": "UNAVAILABLE",
                            "retryable": true,
                        }),
                    )
                }
                OnboardingError::Completed => (
                    StatusCode::CONFLICT,
                    json!({"error": message, "code": "COMPLETED"}),
                ),
                OnboardingError::InactiveStep { active, .. } => (
                    StatusCode::CONFLICT,
                    json!({"error": message, "code": "INACTIVE_STEP", "active": active}),
                ),
                OnboardingError::InvalidDraft(_) => (
                    StatusCode::BAD_REQUEST,
                    json!({"error": message, "code": "INVALID_DRAFT"}),
                ),
                OnboardingError::FileTooLarge { field, max, .. } => (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    json!({
                        "error": message,
                        "code": "FILE_TOO_LARGE",
                        "field": field,
                        "maxBytes": max,
                    }),
                ),
            },
            ApiError::UnknownStep(_) => (
                StatusCode::BAD_REQUEST,
                json!({"error": message, "code": "UNKNOWN_STEP"}),
            ),
            ApiError::Multipart(e) => (
                e.status(),
                json!({"error": message, "code": "INVALID_UPLOAD"}),
            ),
            ApiError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                json!({"error": message, "code": "BAD_REQUEST"}),
            ),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "An internal error occurred", "code": "INTERNAL_ERROR"}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ── Responses ───────────────────────────────────────────────────────

/// Snapshot of a user's onboarding session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user_id: String,
    pub current_step: StepId,
    pub completed: bool,
    pub progress: Progress,
    pub validation: ValidationReport,
    pub record: Fields,
}

impl SessionView {
    fn of(controller: &OnboardingController) -> Self {
        Self {
            user_id: controller.account().user_id.clone(),
            current_step: controller.current_step(),
            completed: controller.is_completed(),
            progress: controller.progress(),
            validation: controller.validation(),
            record: controller.record_fields().clone(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

fn account(user_id: String, headers: &HeaderMap) -> StaffAccount {
    let phone = headers
        .get(PHONE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    StaffAccount::new(user_id, phone.trim())
}

/// GET /api/onboarding/{user_id}
async fn get_session(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.session(account(user_id, &headers)).await?;
    let controller = session.lock().await;
    Ok(Json(SessionView::of(&controller)))
}

/// GET /api/onboarding/{user_id}/drafts/{step}
async fn get_draft(
    State(state): State<OnboardingRouteState>,
    Path((user_id, step)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<StepDraft>> {
    let step: StepId = step.parse()?;
    let session = state.sessions.session(account(user_id, &headers)).await?;
    let controller = session.lock().await;
    controller
        .get_draft(step)
        .cloned()
        .map(Json)
        .ok_or_else(|| OnboardingError::InvalidDraft(format!("step {step} has no draft")).into())
}

/// PATCH /api/onboarding/{user_id}/drafts/{step}
///
/// Overlays the JSON body onto the active step's draft and returns the
/// step's validation status.
async fn patch_draft(
    State(state): State<OnboardingRouteState>,
    Path((user_id, step)): Path<(String, String)>,
    headers: HeaderMap,
    Json(partial): Json<Value>,
) -> ApiResult<Json<ValidationReport>> {
    let step: StepId = step.parse()?;
    let session = state.sessions.session(account(user_id, &headers)).await?;
    let mut controller = session.lock().await;
    Ok(Json(controller.patch_draft(step, &partial)?))
}

/// POST /api/onboarding/{user_id}/drafts/{step}/files
///
/// Multipart form; each part is named after the draft's file field
/// (`profilePhoto`, `certificate`, `aadharFront`, ...). Files are held in
/// the draft until the step is submitted.
async fn upload_files(
    State(state): State<OnboardingRouteState>,
    Path((user_id, step)): Path<(String, String)>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<ValidationReport>> {
    let step: StepId = step.parse()?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await?;
        files.push((name, file_name, data.to_vec()));
    }
    if files.is_empty() {
        return Err(ApiError::BadRequest("no files in upload".to_string()));
    }

    let session = state.sessions.session(account(user_id, &headers)).await?;
    let mut controller = session.lock().await;
    for (field, file_name, content) in files {
        debug!(step = %step, field = %field, bytes = content.len(), "File attached");
        controller.attach_file(step, &field, &file_name, content)?;
    }
    Ok(Json(controller.validation()))
}

/// POST /api/onboarding/{user_id}/advance
///
/// The transition runs on its own task so a dropped connection can't cancel
/// a write halfway. A completed session is dropped from memory.
async fn advance(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.session(account(user_id, &headers)).await?;
    let task = tokio::spawn(async move {
        let mut controller = session.lock().await;
        controller.advance().await?;
        Ok::<_, OnboardingError>(SessionView::of(&controller))
    });
    let view = task
        .await
        .map_err(|e| ApiError::Internal(format!("advance task failed: {e}")))??;
    info!(user_id = %view.user_id, step = %view.current_step, "Onboarding advanced");
    if view.completed {
        state.sessions.evict(&view.user_id).await;
    }
    Ok(Json(view))
}

/// POST /api/onboarding/{user_id}/retreat
async fn retreat(
    State(state): State<OnboardingRouteState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.session(account(user_id, &headers)).await?;
    let mut controller = session.lock().await;
    controller.retreat();
    Ok(Json(SessionView::of(&controller)))
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/{user_id}", get(get_session))
        .route(
            "/api/onboarding/{user_id}/drafts/{step}",
            get(get_draft).patch(patch_draft),
        )
        .route(
            "/api/onboarding/{user_id}/drafts/{step}/files",
            post(upload_files).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY)),
        )
        .route("/api/onboarding/{user_id}/advance", post(advance))
        .route("/api/onboarding/{user_id}/retreat", post(retreat))
        .with_state(state)
}
