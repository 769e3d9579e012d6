//! Static asset handlers, embedded at compile time

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

const PIXMATCH_CSS: &str = include_str!("../../../static/pixmatch.css");
const SEARCH_JS: &str = include_str!("../../../static/search.js");

/// GET /static/pixmatch.css
pub async fn serve_pixmatch_css() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "text/css"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        PIXMATCH_CSS,
    )
        .into_response()
}

/// GET /static/search.js
pub async fn serve_search_js() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "application/javascript"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        SEARCH_JS,
    )
        .into_response()
}
