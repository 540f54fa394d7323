use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::core::errors::ApiError;
use crate::state::AppState;

const INDEX_DOCUMENT: &str = "index.html";

/// Serves a file from the web build, or `index.html` for client-side routes.
pub async fn serve_asset(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let static_dir = &state.config.paths.static_dir;
    let raw_path = request.uri().path().trim_start_matches('/');
    let file = match resolve_static_file(static_dir, raw_path) {
        Some(file) => file,
        None => {
            let index = static_dir.join(INDEX_DOCUMENT);
            if !index.is_file() {
                tracing::error!("index.html not found in static folder: {}", static_dir.display());
                return Err(ApiError::NotFound("Frontend index.html not found.".to_string()));
            }
            index
        }
    };

    let response = match ServeFile::new(&file).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    Ok(response.map(Body::new))
}

/// Maps a request path onto an existing file below `root`.
///
/// Empty paths, directories, and anything that would leave `root`
/// (`..`, absolute or drive-prefixed components) resolve to `None`.
fn resolve_static_file(root: &Path, raw_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(raw_path).ok()?;
    if decoded.is_empty() || decoded.contains('\\') || decoded.contains('\0') {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in Path::new(&*decoded).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if relative.as_os_str().is_empty() {
        return None;
    }

    let candidate = root.join(relative);
    candidate.is_file().then_some(candidate)
}
