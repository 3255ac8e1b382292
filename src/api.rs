// 🌐 REST API - axum router over a shared SqliteStore
//
// Every handler locks the store for the duration of one request; a parse
// runs the whole transcript under the same lock.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::Error;
use crate::ingest::{ChatIngestor, IngestOptions, ParseOutcome};
use crate::member::{Payment, Position, RosterMember};
use crate::store::{Roster, SqliteStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<SqliteStore>>,
    pub options: Arc<IngestOptions>,
}

impl AppState {
    pub fn new(store: SqliteStore, options: IngestOptions) -> Self {
        AppState {
            store: Arc::new(Mutex::new(store)),
            options: Arc::new(options),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqliteStore>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError::internal("store lock poisoned"))
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error half of a handler result
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Duplicate(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %err, "request failed");
        }
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayerRequest {
    pub name: String,
    pub skill_level: Option<u8>,
    pub position: Option<Position>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub player_name: String,
    pub amount: f64,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtorResponse {
    pub name: String,
    pub total_debt: f64,
    pub total_paid: f64,
    pub debt: f64,
}

impl From<RosterMember> for DebtorResponse {
    fn from(member: RosterMember) -> Self {
        Self {
            debt: member.debt(),
            name: member.name,
            total_debt: member.total_debt,
            total_paid: member.total_paid,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub members_reset: usize,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/chat/parse - Ingest a transcript
async fn parse_chat(
    State(state): State<AppState>,
    Json(request): Json<ParseRequest>,
) -> ApiResult<ParseOutcome> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("text cannot be empty"));
    }

    let mut store = state.lock()?;
    let options = (*state.options).clone();

    let outcome = ChatIngestor::with_options(&mut *store, options).parse(&request.text);
    let digest = store.record_transcript(&request.text, &outcome)?;
    info!(digest = %digest, "transcript ingested via API");

    Ok(Json(ApiResponse::ok(outcome)))
}

/// GET /api/players - Every member
async fn get_players(State(state): State<AppState>) -> ApiResult<Vec<RosterMember>> {
    let store = state.lock()?;
    Ok(Json(ApiResponse::ok(store.all_members()?)))
}

/// POST /api/players - Add a member
async fn add_player(
    State(state): State<AppState>,
    Json(request): Json<NewPlayerRequest>,
) -> ApiResult<RosterMember> {
    let mut store = state.lock()?;
    let member = store.create_member(
        &request.name,
        request
            .skill_level
            .unwrap_or(state.options.resolver.default_skill),
        request
            .position
            .unwrap_or(state.options.resolver.default_position),
    )?;
    Ok(Json(ApiResponse::ok(member)))
}

/// GET /api/players/debt - Members who owe money
async fn get_debtors(State(state): State<AppState>) -> ApiResult<Vec<DebtorResponse>> {
    let store = state.lock()?;
    let debtors = store
        .members_with_debt()?
        .into_iter()
        .map(DebtorResponse::from)
        .collect();
    Ok(Json(ApiResponse::ok(debtors)))
}

/// POST /api/players/attendance/reset - New session
async fn reset_attendance(State(state): State<AppState>) -> ApiResult<ResetResponse> {
    let mut store = state.lock()?;
    let members_reset = store.reset_attendance()?;
    Ok(Json(ApiResponse::ok(ResetResponse { members_reset })))
}

/// GET /api/payments - Ledger entries
async fn get_payments(State(state): State<AppState>) -> ApiResult<Vec<Payment>> {
    let store = state.lock()?;
    Ok(Json(ApiResponse::ok(store.payments()?)))
}

/// POST /api/payments - Manual payment with a real amount
async fn record_payment(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<Payment> {
    let mut store = state.lock()?;
    let payment =
        store.record_payment(&request.player_name, request.amount, request.note.as_deref())?;
    Ok(Json(ApiResponse::ok(payment)))
}

/// Build the full router (`/api/...`)
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/chat/parse", post(parse_chat))
        .route("/players", get(get_players).post(add_player))
        .route("/players/debt", get(get_debtors))
        .route("/players/attendance/reset", post(reset_attendance))
        .route("/payments", get(get_payments).post(record_payment))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
