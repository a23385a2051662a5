use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::Form;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::history::LogEntry;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub query: String,
}

pub async fn chat_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let entries = state.chat_log().load().await;
    Html(render_page(&state.config.llm.manual_title, &entries))
}

/// Answers a non-blank query, then re-renders the whole history.
pub async fn submit_query(
    State(state): State<Arc<AppState>>,
    form: Option<Form<ChatForm>>,
) -> Result<Html<String>, ApiError> {
    let query = form.map(|Form(form)| form.query).unwrap_or_default();
    let query = query.trim();
    if !query.is_empty() {
        state.generator.generate_response(query).await?;
    }

    let entries = state.chat_log().load().await;
    Ok(Html(render_page(&state.config.llm.manual_title, &entries)))
}

fn render_page(title: &str, entries: &[LogEntry]) -> String {
    let title = encode_text(title);
    let mut html = String::with_capacity(4096);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} Assistant</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; max-width: 860px; margin: 2em auto; }}\n\
         .turn {{ border-bottom: 1px solid #ddd; padding: 1em 0; }}\n\
         .meta {{ color: #777; font-size: 0.85em; }}\n\
         .answer {{ white-space: pre-wrap; }}\n\
         .images img {{ max-width: 240px; margin: 0.25em; }}\n\
         </style>\n</head>\n<body>\n<h1>{title}</h1>\n<div id=\"history\">\n"
    );

    for entry in entries {
        render_turn(&mut html, entry);
    }

    html.push_str(
        "</div>\n<form method=\"post\" action=\"/\">\n\
         <input type=\"text\" name=\"query\" size=\"80\" autofocus \
         placeholder=\"Ask about the manual\">\n\
         <button type=\"submit\">Ask</button>\n</form>\n</body>\n</html>\n",
    );
    html
}

fn render_turn(html: &mut String, entry: &LogEntry) {
    let _ = write!(
        html,
        "<div class=\"turn\">\n<p class=\"meta\">{}</p>\n\
         <p class=\"question\"><strong>You:</strong> {}</p>\n\
         <div class=\"answer\"><strong>Assistant:</strong> {}</div>\n",
        encode_text(&entry.timestamp),
        encode_text(&entry.user_query),
        encode_text(&entry.final_answer),
    );

    if !entry.images.is_empty() {
        html.push_str("<div class=\"images\">\n");
        for image in &entry.images {
            let src = format!("/static/images/{}", image.filename);
            let src = encode_double_quoted_attribute(&src);
            let _ = writeln!(
                html,
                "<a href=\"{src}\"><img src=\"{src}\" alt=\"Page {} image\"></a>",
                image.page
            );
        }
        html.push_str("</div>\n");
    }
    html.push_str("</div>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Metrics, TokensUsed};
    use crate::rag::RetrievedImage;

    fn entry() -> LogEntry {
        LogEntry {
            timestamp: "2025-03-01 10:00:00 HKT".to_string(),
            user_query: "<script>alert(1)</script>".to_string(),
            expanded_query: String::new(),
            retrieved_chunks: Vec::new(),
            images: vec![RetrievedImage {
                id: "img_0".to_string(),
                page: 3,
                path: "/srv/static/images/page3_img0.png".to_string(),
                filename: "page3_img0.png".to_string(),
                score: 0.4,
            }],
            raw_answer: String::new(),
            final_answer: "Use the \"main\" breaker & wait".to_string(),
            metrics: Metrics::default(),
            tokens_used: TokensUsed::default(),
        }
    }

    #[test]
    fn escapes_user_content() {
        let html = render_page("Manual", &[entry()]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("Use the \"main\" breaker &amp; wait"));
    }

    #[test]
    fn links_images_under_static_path() {
        let html = render_page("Manual", &[entry()]);
        assert!(html.contains("<img src=\"/static/images/page3_img0.png\" alt=\"Page 3 image\">"));
    }

    #[test]
    fn image_attributes_are_quoted_safely() {
        let mut entry = entry();
        entry.images[0].filename = "a\"b<c>.png".to_string();
        let html = render_page("Manual", &[entry]);
        assert!(html.contains("src=\"/static/images/a&quot;b&lt;c&gt;.png\""));
    }

    #[test]
    fn empty_history_still_has_the_form() {
        let html = render_page("Manual", &[]);
        assert!(html.contains("<form method=\"post\" action=\"/\">"));
        assert!(!html.contains("class=\"turn\""));
    }
}
