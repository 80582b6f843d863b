pub mod chat;
pub mod settings;

use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// All routes: the page plus its JSON/SSE API.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Serve frontend
        .route("/", get(serve_index))
        // API routes
        .route("/api/conversation", get(chat::get_conversation))
        .route("/api/query", post(chat::query))
        .route("/api/events", get(chat::events))
        .route(
            "/api/settings",
            get(settings::get_settings)
                .put(settings::update_settings)
                .delete(settings::clear_settings),
        )
        .with_state(state)
}

const INDEX_HTML: &str = include_str!("../../static/index.html");

async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passage_links_are_scheme_checked() {
        // Backend URLs only become hrefs behind the http(s) check
        assert!(INDEX_HTML.contains(r#"u.protocol === "http:" || u.protocol === "https:""#));
        for line in INDEX_HTML.lines().filter(|l| l.contains("a.href = p.url")) {
            assert!(line.contains("if (isWebUrl(p.url))"), "unguarded link: {line}");
        }
    }
}
