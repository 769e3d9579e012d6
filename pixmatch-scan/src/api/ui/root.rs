//! Root page handler - search page

use axum::response::{Html, IntoResponse};

/// GET /
///
/// Reference picker, library picker (files or folder), scan control,
/// progress bar and ranked results.
pub async fn root_page() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = env!("PIXMATCH_GIT_HASH");
    let build_timestamp = env!("PIXMATCH_BUILD_TIMESTAMP");
    let build_profile = env!("PIXMATCH_BUILD_PROFILE");

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>pixmatch - Visual Search</title>
    <link rel="stylesheet" href="/static/pixmatch.css">
</head>
<body>
    <header>
        <div class="header-content">
            <div class="header-left">
                <h1>pixmatch <span id="connection-status" class="connection-status status-connecting">Connecting...</span></h1>
                <div class="subtitle">Find images that look like a reference image</div>
            </div>
            <div class="header-right">
                <div>v{version} [{git_hash}]</div>
                <div>{build_timestamp} ({build_profile})</div>
            </div>
        </div>
    </header>

    <main class="container">
        <section class="panel" id="reference-panel">
            <h2>1. Reference image</h2>
            <label class="drop-zone" id="reference-drop">
                <input type="file" id="reference-input" accept="image/*" hidden>
                <img id="reference-preview" alt="" hidden>
                <span id="reference-hint">Click or drop an image</span>
            </label>
        </section>

        <section class="panel" id="library-panel">
            <h2>2. Candidate library</h2>
            <div class="controls">
                <label class="button">Select images
                    <input type="file" id="library-input" accept="image/*" multiple hidden>
                </label>
                <label class="button">Select folder
                    <input type="file" id="folder-input" webkitdirectory multiple hidden>
                </label>
                <button class="button secondary" id="clear-library">Clear</button>
            </div>
            <div id="library-summary" class="muted">No candidates loaded</div>
            <div id="library-grid" class="thumb-grid"></div>
        </section>

        <section class="panel" id="scan-panel">
            <h2>3. Search</h2>
            <div class="controls">
                <button class="button" id="start-scan" disabled>Start scan</button>
                <button class="button secondary" id="reset">Reset</button>
            </div>
            <div class="progress" id="progress" hidden>
                <div class="progress-bar" id="progress-bar"></div>
            </div>
            <div id="progress-text" class="muted"></div>
            <div id="error" class="error" hidden></div>
        </section>

        <section class="panel" id="results-panel">
            <h2>Results</h2>
            <div id="results-empty" class="muted">No results yet</div>
            <div id="results" class="result-grid"></div>
        </section>
    </main>

    <script src="/static/search.js"></script>
</body>
</html>
"#
    );

    Html(html)
}
