//! HTTP API for the board.
//!
//! The UI client drives every board event through this loopback surface.
//! Engine errors come back as error envelopes; nothing here panics a
//! request.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::BoardDisplay;
use crate::sequences::Sequence;
use crate::service::BoardService;

pub type SharedBoard = Arc<Mutex<BoardService>>;

// --- Request/Response types ---

#[derive(Serialize)]
struct StatusResponse {
    speaking: bool,
    pending_playback: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_sequence_id: Option<String>,
    step_index: usize,
    step_count: usize,
}

#[derive(Serialize)]
struct SimpleResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SimpleResponse {
    fn ok(status: &str) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            error: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
struct SequenceInfo {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    symbol_ids: Vec<String>,
    preset: bool,
}

#[derive(Serialize)]
struct SaveResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence: Option<Sequence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct SymbolQuery {
    category: Option<String>,
}

#[derive(Deserialize)]
struct SelectRequest {
    id: String,
}

#[derive(Deserialize)]
struct SaveRequest {
    #[serde(default)]
    id: Option<String>,
    name: String,
    symbol_ids: Vec<String>,
}

#[derive(Deserialize)]
struct EditStepRequest {
    step_index: usize,
    symbol_id: String,
}

#[derive(Deserialize)]
struct ToggleFavoriteRequest {
    filename: String,
}

#[derive(Serialize)]
struct FavoriteResponse {
    filename: String,
    favorite: bool,
}

#[derive(Deserialize)]
struct SpeakRequest {
    text: String,
    #[serde(default)]
    spell_out: bool,
}

// --- Router ---

pub fn router(state: SharedBoard) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .route("/board", get(handle_board))
        .route("/symbols", get(handle_symbols))
        .route("/symbols/filenames", get(handle_filenames))
        .route("/categories", get(handle_categories))
        .route("/sequences", get(handle_sequences).post(handle_save))
        .route("/sequences/{id}", delete(handle_delete))
        .route("/sequences/{id}/edit-step", post(handle_edit_step))
        .route("/sequences/select", post(handle_select))
        .route("/sequences/deselect", post(handle_deselect))
        .route("/step/forward", post(handle_step_forward))
        .route("/step/backward", post(handle_step_backward))
        .route("/favorites", get(handle_favorites))
        .route("/favorites/toggle", post(handle_toggle_favorite))
        .route("/speak", post(handle_speak))
        .route("/cancel", post(handle_cancel))
        .with_state(state)
}

/// Serve the board API on the loopback interface until shutdown.
pub async fn serve(state: SharedBoard, port: u16) -> std::io::Result<()> {
    let app = router(state);
    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Board API listening on {addr}");
    axum::serve(listener, app).await
}

// --- Handlers ---

async fn handle_status(State(state): State<SharedBoard>) -> Json<StatusResponse> {
    let board = state.lock().unwrap();
    let display = board.display();
    Json(StatusResponse {
        speaking: board.is_speaking(),
        pending_playback: board.pending_playback(),
        selected_sequence_id: board.selected_sequence_id().map(String::from),
        step_index: display.step_index,
        step_count: display.step_count,
    })
}

async fn handle_board(State(state): State<SharedBoard>) -> Json<BoardDisplay> {
    Json(state.lock().unwrap().display())
}

async fn handle_symbols(
    State(state): State<SharedBoard>,
    Query(query): Query<SymbolQuery>,
) -> Json<serde_json::Value> {
    let board = state.lock().unwrap();
    let symbols = match query.category.as_deref() {
        // "Favorites" is a pseudo-category backed by the favorite set.
        Some("Favorites") => board
            .catalog()
            .symbols()
            .iter()
            .filter(|s| board.favorites().contains(&s.filename))
            .collect(),
        Some(category) => board.catalog().in_category(category),
        None => board.catalog().symbols().iter().collect(),
    };
    Json(serde_json::json!({ "symbols": symbols }))
}

/// Flat filename list for the symbol picker.
async fn handle_filenames(State(state): State<SharedBoard>) -> Json<Vec<String>> {
    Json(state.lock().unwrap().catalog().filenames())
}

async fn handle_categories(State(state): State<SharedBoard>) -> Json<Vec<String>> {
    Json(state.lock().unwrap().catalog().categories())
}

async fn handle_sequences(State(state): State<SharedBoard>) -> Json<Vec<SequenceInfo>> {
    let board = state.lock().unwrap();
    let infos = board
        .store()
        .list_all()
        .into_iter()
        .map(|s| SequenceInfo {
            id: s.id.clone(),
            name: s.name.clone(),
            description: s.description.clone(),
            symbol_ids: s.symbol_ids.clone(),
            preset: board.store().is_preset(&s.id),
        })
        .collect();
    Json(infos)
}

async fn handle_save(
    State(state): State<SharedBoard>,
    Json(req): Json<SaveRequest>,
) -> Json<SaveResponse> {
    let mut board = state.lock().unwrap();
    match board.save_sequence(req.id, &req.name, req.symbol_ids) {
        Ok(sequence) => Json(SaveResponse {
            status: "saved".into(),
            sequence: Some(sequence),
            error: None,
        }),
        Err(e) => Json(SaveResponse {
            status: "error".into(),
            sequence: None,
            error: Some(e.to_string()),
        }),
    }
}

async fn handle_delete(
    State(state): State<SharedBoard>,
    Path(id): Path<String>,
) -> Json<SimpleResponse> {
    if state.lock().unwrap().delete_sequence(&id) {
        Json(SimpleResponse::ok("deleted"))
    } else {
        Json(SimpleResponse::err(format!("no user sequence {id}")))
    }
}

async fn handle_edit_step(
    State(state): State<SharedBoard>,
    Path(id): Path<String>,
    Json(req): Json<EditStepRequest>,
) -> Json<SaveResponse> {
    let mut board = state.lock().unwrap();
    match board.edit_step(&id, req.step_index, &req.symbol_id) {
        Ok(sequence) => Json(SaveResponse {
            status: "saved".into(),
            sequence: Some(sequence),
            error: None,
        }),
        Err(e) => Json(SaveResponse {
            status: "error".into(),
            sequence: None,
            error: Some(e.to_string()),
        }),
    }
}

async fn handle_select(
    State(state): State<SharedBoard>,
    Json(req): Json<SelectRequest>,
) -> Json<BoardDisplay> {
    Json(state.lock().unwrap().select_sequence(&req.id))
}

async fn handle_deselect(State(state): State<SharedBoard>) -> Json<BoardDisplay> {
    Json(state.lock().unwrap().deselect_sequence())
}

async fn handle_step_forward(State(state): State<SharedBoard>) -> Json<BoardDisplay> {
    Json(state.lock().unwrap().step_forward())
}

async fn handle_step_backward(State(state): State<SharedBoard>) -> Json<BoardDisplay> {
    Json(state.lock().unwrap().step_backward())
}

async fn handle_favorites(State(state): State<SharedBoard>) -> Json<Vec<String>> {
    Json(state.lock().unwrap().favorites().filenames())
}

async fn handle_toggle_favorite(
    State(state): State<SharedBoard>,
    Json(req): Json<ToggleFavoriteRequest>,
) -> Json<FavoriteResponse> {
    let favorite = state.lock().unwrap().toggle_favorite(&req.filename);
    Json(FavoriteResponse {
        filename: req.filename,
        favorite,
    })
}

async fn handle_speak(
    State(state): State<SharedBoard>,
    Json(req): Json<SpeakRequest>,
) -> Json<SimpleResponse> {
    if req.text.trim().is_empty() {
        return Json(SimpleResponse::err("empty text"));
    }

    state.lock().unwrap().speak(&req.text, req.spell_out);
    Json(SimpleResponse::ok("speaking"))
}

async fn handle_cancel(State(state): State<SharedBoard>) -> Json<SimpleResponse> {
    state.lock().unwrap().cancel_speech();
    Json(SimpleResponse::ok("cancelled"))
}
