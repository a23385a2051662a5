use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let retriever = state.retriever();
    Json(json!({
        "status": "ok",
        "text_chunks": retriever.text_count(),
        "images": retriever.image_count(),
    }))
}
