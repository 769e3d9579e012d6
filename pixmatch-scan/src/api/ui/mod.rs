//! UI routes - single-page search interface
//!
//! Vanilla HTML/CSS/JS, no frameworks. The page talks to the REST API and
//! follows scan progress over `/events`.

use crate::AppState;
use axum::{routing::get, Router};

mod root;
mod static_assets;

use root::root_page;
use static_assets::{serve_pixmatch_css, serve_search_js};

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_page))
        .route("/static/pixmatch.css", get(serve_pixmatch_css))
        .route("/static/search.js", get(serve_search_js))
}
