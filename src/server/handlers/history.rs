use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::history::LogEntry;
use crate::state::AppState;

pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<Vec<LogEntry>> {
    Json(state.chat_log().load().await)
}
