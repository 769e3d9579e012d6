//! HTTP API handlers for pixmatch-scan
//!
//! REST endpoints for the workspace and scan lifecycle, plus an SSE stream
//! for live progress.

pub mod health;
pub mod images;
pub mod scan;
pub mod sse;
pub mod ui;

pub use health::health_routes;
pub use images::image_routes;
pub use scan::scan_routes;
pub use sse::event_stream;
pub use ui::ui_routes;
