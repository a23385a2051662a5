use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

/// `POST /api/ask` with a JSON `{"query": "..."}` body.
///
/// The body is parsed by hand so that a missing or malformed payload yields
/// the same 400 as an empty query. Only an empty string counts as empty; a
/// whitespace-only query is answered like any other.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let query = extract_query(&body)
        .ok_or_else(|| ApiError::BadRequest("query required".to_string()))?;

    let (answer, entry) = state.generator.generate_response(&query).await?;
    Ok(Json(json!({
        "answer": answer,
        "sources": entry,
    })))
}

fn extract_query(body: &[u8]) -> Option<String> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    payload
        .get("query")
        .and_then(Value::as_str)
        .filter(|query| !query.is_empty())
        .map(str::to_string)
}
