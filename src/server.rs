use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::any::Any;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::routes::{empty, serve_static, StaticFiles};

pub const DEFAULT_PORT: u16 = 3000;

const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub public_dir: PathBuf,
    pub port: u16,
    pub log_requests: bool,
}

/// Every path and every method goes to the static file handler.
pub fn router(config: &ServeConfig) -> Router {
    let files = Arc::new(StaticFiles::new(
        config.public_dir.clone(),
        config.log_requests,
    ));

    with_layers(Router::new().fallback(serve_static).with_state(files))
}

/// Request tracing plus panic containment: a panicking handler answers an
/// empty 500 and the connection keeps being served.
pub fn with_layers(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(panic_response)),
    )
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "request handler panicked");
    empty(StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn start_server(config: ServeConfig) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    serve(listener, config).await
}

/// Run the accept loop on an already bound listener. Only returns on a
/// setup failure; individual connection errors are logged and dropped.
pub async fn serve(listener: TcpListener, config: ServeConfig) -> Result<()> {
    let local = listener.local_addr()?;
    let app = router(&config);

    info!("listening on port {}", local.port());
    info!("Serving directory: {:?}", config.public_dir);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Accept error: {}", e);
                let delay = accept_backoff(&e);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let service = TowerToHyperService::new(app.clone());

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(io, service)
                .await
            {
                debug!(%peer, "Connection error: {}", e);
            }
        });
    }
}

/// Per-connection failures are retried at once; anything else (EMFILE and
/// friends) stays failing until resources free up, so wait before retrying.
fn accept_backoff(err: &io::Error) -> Duration {
    match err.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset => Duration::ZERO,
        _ => ACCEPT_BACKOFF,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn config(dir: &TempDir) -> ServeConfig {
        ServeConfig {
            public_dir: dir.path().to_path_buf(),
            port: 0,
            log_requests: false,
        }
    }

    #[tokio::test]
    async fn test_router_serves_any_method() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("script.js"), "console.log(1)").unwrap();
        let app = router(&config(&dir));

        let resp = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/script.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/javascript"
        );
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"console.log(1)");
    }

    #[tokio::test]
    async fn test_router_404() {
        let dir = TempDir::new().unwrap();
        let app = router(&config(&dir));

        let resp = app
            .oneshot(Request::get("/nope.css").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    async fn flaky(uri: axum::http::Uri) -> &'static str {
        if uri.path() == "/boom" {
            panic!("handler blew up");
        }
        "still here"
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_empty_500() {
        let app = with_layers(Router::new().fallback(flaky));

        let resp = app
            .clone()
            .oneshot(Request::get("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());

        let resp = app
            .oneshot(Request::get("/fine").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"still here");
    }

    #[test]
    fn test_accept_backoff() {
        let emfile = io::Error::from_raw_os_error(24);
        assert_eq!(accept_backoff(&emfile), ACCEPT_BACKOFF);
        assert_eq!(
            accept_backoff(&io::Error::from(io::ErrorKind::Other)),
            ACCEPT_BACKOFF
        );
        assert_eq!(
            accept_backoff(&io::Error::from(io::ErrorKind::ConnectionAborted)),
            Duration::ZERO
        );
        assert_eq!(
            accept_backoff(&io::Error::from(io::ErrorKind::ConnectionReset)),
            Duration::ZERO
        );
    }
}
