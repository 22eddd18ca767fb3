use crate::error::ServeError;
use crate::mime_types::content_type_for;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const INDEX_PATH: &str = "/index.html";

/// Everything known about a request once its path has been resolved.
/// Lives for one request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Path as it arrived on the request line (no query string)
    pub requested: String,
    /// Decoded and normalized URL path, always starting with `/`
    pub normalized: String,
    /// Location on disk, always inside the base directory
    pub resolved: PathBuf,
    pub content_type: &'static str,
}

/// Map a request path onto a file under `base_dir`.
///
/// No filesystem access happens here; the returned path is confined to
/// `base_dir` purely by normalization.
pub fn resolve(base_dir: &Path, request_path: &str) -> Result<RequestContext, ServeError> {
    let path = if request_path == "/" {
        INDEX_PATH
    } else {
        request_path
    };

    // Decoded before normalization so `%2e%2e` counts as `..`. A file whose
    // name literally contains `%20` has to be requested as `%2520`.
    let decoded = urlencoding::decode(path)
        .map_err(|e| ServeError::Unexpected(format!("invalid URL encoding in {path:?}: {e}")))?;

    if decoded.contains('\0') {
        return Err(ServeError::Unexpected(format!(
            "path contains null bytes: {path:?}"
        )));
    }

    let segments = normalize_segments(&decoded);

    let mut resolved = base_dir.to_path_buf();
    resolved.extend(&segments);

    let normalized = format!("/{}", segments.join("/"));
    let content_type = content_type_for(&normalized);

    debug!(requested = request_path, resolved = %resolved.display(), "path resolved");

    Ok(RequestContext {
        requested: request_path.to_string(),
        normalized,
        resolved,
        content_type,
    })
}

/// Collapse `.` and `..` segments. `..` never climbs above the root.
pub fn normalize_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    segments
}
