use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{ask, chat, health, history};
use crate::state::AppState;

/// Creates the application router.
///
/// - `/` chat page (GET renders, POST submits a form query)
/// - `/api/ask` JSON question answering
/// - `/api/history` raw chat log
/// - `/health` store sizes
/// - `/static/images` extracted manual images
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_allowed_origins);
    let images = ServeDir::new(&state.paths.image_dir);

    Router::new()
        .route("/", get(chat::chat_page).post(chat::submit_query))
        .route("/api/ask", post(ask::ask))
        .route("/api/history", get(history::get_history))
        .route("/health", get(health::health))
        .nest_service("/static/images", images)
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let origins = resolve_allowed_origins(configured);

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<HeaderValue> {
    configured
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_invalid_origins_are_dropped() {
        let origins = resolve_allowed_origins(&[
            "http://localhost:3000".to_string(),
            "   ".to_string(),
            "bad\norigin".to_string(),
        ]);
        assert_eq!(origins, vec![HeaderValue::from_static("http://localhost:3000")]);
    }

    #[test]
    fn no_configured_origins_means_none_resolved() {
        assert!(resolve_allowed_origins(&[]).is_empty());
    }
}
