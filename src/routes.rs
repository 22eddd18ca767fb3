use crate::error::ServeError;
use crate::path::{resolve, RequestContext};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, Response, StatusCode, Uri};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

/// Read size for streamed bodies
const CHUNK_SIZE: usize = 16 * 1024;

/// Immutable per-server state shared by every request.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    pub public_dir: PathBuf,
    pub log_requests: bool,
}

impl StaticFiles {
    pub fn new(public_dir: PathBuf, log_requests: bool) -> Self {
        Self {
            public_dir,
            log_requests,
        }
    }

    /// Serve one request. The method is ignored; every request is a file
    /// fetch. No status is committed until the file is open.
    pub async fn handle(&self, method: &Method, uri: &Uri) -> Response<Body> {
        let path = uri.path();

        match self.open(path).await {
            Ok((ctx, file, len)) => {
                if self.log_requests {
                    info!(
                        method = %method,
                        path = %ctx.requested,
                        resolved = %ctx.resolved.display(),
                        status = 200,
                        "request"
                    );
                }
                file_response(&ctx, file, len)
            }
            Err(e) => {
                let status = e.status();
                match &e {
                    ServeError::NotFound { .. } => {
                        warn!(method = %method, path = path, status = status.as_u16(), "{e}");
                    }
                    ServeError::Unexpected(_) => {
                        error!(
                            method = %method,
                            path = path,
                            status = status.as_u16(),
                            error = ?e,
                            "request failed"
                        );
                    }
                }
                empty(status)
            }
        }
    }

    async fn open(&self, path: &str) -> Result<(RequestContext, File, u64), ServeError> {
        let ctx = resolve(&self.public_dir, path)?;

        let file = File::open(&ctx.resolved)
            .await
            .map_err(|e| ServeError::not_found(&ctx.resolved, e))?;

        let metadata = file
            .metadata()
            .await
            .map_err(|e| ServeError::not_found(&ctx.resolved, e))?;

        // Directories open fine on unix but cannot be read as a body.
        if !metadata.is_file() {
            return Err(ServeError::not_found(
                &ctx.resolved,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        Ok((ctx, file, metadata.len()))
    }
}

/// Axum fallback: every path and method lands here.
pub async fn serve_static(
    State(files): State<Arc<StaticFiles>>,
    method: Method,
    uri: Uri,
) -> Response<Body> {
    files.handle(&method, &uri).await
}

fn file_response(ctx: &RequestContext, file: File, len: u64) -> Response<Body> {
    let stream = ReaderStream::with_capacity(file, CHUNK_SIZE);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ctx.content_type)
        .header(header::CONTENT_LENGTH, len)
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| empty(StatusCode::INTERNAL_SERVER_ERROR))
}

#[inline]
pub fn empty(status: StatusCode) -> Response<Body> {
    let mut resp = Response::new(Body::empty());
    *resp.status_mut() = status;
    resp
}
