use std::env;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use santa_core::{Participant, SantaError, Session};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    session: Arc<RwLock<Session>>,
    admin_passphrase: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(admin_passphrase())
    }
}

impl AppState {
    pub fn new(admin_passphrase: impl Into<String>) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::new())),
            admin_passphrase: admin_passphrase.into(),
        }
    }
}

// Static shared passphrase, not a credential mechanism. Fine for a party
// app; anything real should replace this.
fn admin_passphrase() -> String {
    env::var("ADMIN_PASSPHRASE").unwrap_or_else(|_| "admin123".to_string())
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/participants", post(register_participant))
        .route("/participants/:index", delete(remove_participant))
        .route("/session", get(get_session))
        .route("/draw", post(perform_draw))
        .route("/resolve", post(resolve_recipient))
        .route("/admin/assignments", post(reveal_assignments))
        .route("/reset", post(reset_session))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] SantaError);

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            SantaError::EmptyName
            | SantaError::InvalidPinLength
            | SantaError::NameRequired
            | SantaError::UnexpectedPin
            | SantaError::InsufficientParticipants => StatusCode::BAD_REQUEST,
            SantaError::DuplicateName | SantaError::DrawFailed | SantaError::DrawNotYetPerformed => {
                StatusCode::CONFLICT
            }
            SantaError::IndexOutOfRange | SantaError::UnknownParticipant => StatusCode::NOT_FOUND,
            SantaError::WrongPin | SantaError::WrongAdminPassphrase => StatusCode::UNAUTHORIZED,
        };
        let body = ErrorBody {
            error: error_kind(&self.0),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn error_kind(err: &SantaError) -> &'static str {
    match err {
        SantaError::EmptyName => "empty_name",
        SantaError::DuplicateName => "duplicate_name",
        SantaError::InvalidPinLength => "invalid_pin_length",
        SantaError::IndexOutOfRange => "index_out_of_range",
        SantaError::InsufficientParticipants => "insufficient_participants",
        SantaError::DrawFailed => "draw_failed",
        SantaError::DrawNotYetPerformed => "draw_not_yet_performed",
        SantaError::NameRequired => "name_required",
        SantaError::UnknownParticipant => "unknown_participant",
        SantaError::WrongPin => "wrong_pin",
        SantaError::UnexpectedPin => "unexpected_pin",
        SantaError::WrongAdminPassphrase => "wrong_admin_passphrase",
    }
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    pin: Option<String>,
}

// PINs never leave the server, only whether one is set.
#[derive(Serialize)]
struct ParticipantView {
    name: String,
    has_pin: bool,
}

impl From<&Participant> for ParticipantView {
    fn from(p: &Participant) -> Self {
        Self {
            name: p.name.clone(),
            has_pin: p.has_pin(),
        }
    }
}

#[derive(Serialize)]
struct SessionView {
    participants: Vec<ParticipantView>,
    drawn: bool,
}

#[derive(Deserialize)]
struct DrawParams {
    seed: Option<u64>,
}

#[derive(Serialize)]
struct DrawResponse {
    drawn: bool,
    participants: usize,
}

#[derive(Deserialize)]
struct ResolveRequest {
    name: String,
    pin: Option<String>,
}

#[derive(Serialize)]
struct ResolveResponse {
    recipient: String,
}

#[derive(Serialize)]
struct PairView {
    giver: String,
    recipient: String,
}

async fn register_participant(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut session = state.session.write().await;
    let participant = session.register(&payload.name, payload.pin.as_deref().unwrap_or(""))?;
    Ok((
        StatusCode::CREATED,
        Json(ParticipantView::from(&participant)),
    ))
}

async fn remove_participant(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<ParticipantView>, ApiError> {
    let mut session = state.session.write().await;
    let removed = session.remove(index)?;
    Ok(Json(ParticipantView::from(&removed)))
}

async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    let session = state.session.read().await;
    Json(SessionView {
        participants: session
            .participants()
            .iter()
            .map(ParticipantView::from)
            .collect(),
        drawn: session.drawn(),
    })
}

// The mapping itself stays server-side; recipients come out one at a time
// through /resolve, or all at once through the admin gate.
async fn perform_draw(
    State(state): State<AppState>,
    Query(params): Query<DrawParams>,
) -> Result<Json<DrawResponse>, ApiError> {
    let mut rng = params
        .seed
        .map(ChaCha8Rng::seed_from_u64)
        .unwrap_or_else(ChaCha8Rng::from_entropy);

    let mut session = state.session.write().await;
    let assignment = session.draw(&mut rng)?;
    let participants = assignment.len();
    Ok(Json(DrawResponse {
        drawn: true,
        participants,
    }))
}

async fn resolve_recipient(
    State(state): State<AppState>,
    Json(payload): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let session = state.session.read().await;
    let recipient = session
        .resolve(&payload.name, payload.pin.as_deref().unwrap_or(""))?
        .to_string();
    Ok(Json(ResolveResponse { recipient }))
}

async fn reveal_assignments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PairView>>, ApiError> {
    let provided = headers
        .get("x-admin-passphrase")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let session = state.session.read().await;
    let pairs = session.reveal_all(provided, &state.admin_passphrase)?;
    Ok(Json(
        pairs
            .iter()
            .map(|(giver, recipient)| PairView {
                giver: giver.clone(),
                recipient: recipient.clone(),
            })
            .collect(),
    ))
}

async fn reset_session(State(state): State<AppState>) -> StatusCode {
    state.session.write().await.reset();
    StatusCode::OK
}
