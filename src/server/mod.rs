//! Axum HTTP surface.
//!
//! [`build`] assembles the router:
//! - `POST /api/byte` and `POST /api/convert`
//! - `GET /health`
//! - published ringtones under the configured downloads route
//! - the static web UI as fallback
//!
//! wrapped in request-id, tracing and CORS layers.

mod byte;
mod convert;
pub mod error;
mod health;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Request};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::convert::Converter;
use crate::retention::Sweeper;
use crate::ringtone::RingtoneMaker;
use crate::tools::{Ffmpeg, YtDlp};
use crate::Result;

pub use error::ApiError;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ringtones: Arc<RingtoneMaker>,
    pub converter: Arc<Converter>,
}

impl AppState {
    /// Wire the real yt-dlp and ffmpeg tools according to `config`.
    pub fn from_config(config: Config) -> Self {
        let downloader = Arc::new(YtDlp::with_program(&config.tools.yt_dlp_path));
        let transcoder = Arc::new(Ffmpeg::with_program(&config.tools.ffmpeg_path));

        Self {
            ringtones: Arc::new(RingtoneMaker::from_config(&config, downloader)),
            converter: Arc::new(Converter::from_config(&config, transcoder)),
            config: Arc::new(config),
        }
    }
}

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let api = Router::new()
        .route("/api/byte", post(byte::create_ringtone))
        .route("/api/convert", post(convert::convert_upload))
        .route("/health", get(health::get_health))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .with_state(state);

    let request_id_header = "x-request-id";

    api.nest_service(
        &config.paths.downloads_route,
        ServeDir::new(&config.paths.downloads_dir),
    )
    .fallback_service(ServeDir::new(&config.paths.static_dir))
    .layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(move |req: &Request<_>| {
                    let request_id = req
                        .headers()
                        .get(request_id_header)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %req.method(),
                        path = %req.uri().path(),
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(cors_layer(&config)),
    )
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_allowed_origins
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

/// Run the HTTP server until SIGINT/SIGTERM.
///
/// Abandoned scratch space is cleared before binding; the retention sweeper
/// runs in the background for the lifetime of the server.
pub async fn serve(config: Config) -> Result<()> {
    let sweeper = Sweeper::from_config(&config);
    sweeper.run_once().await;
    let sweeper_task = sweeper.spawn();

    let addr: SocketAddr = config.server.bind_address.parse()?;
    let app = build(AppState::from_config(config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper_task.abort();
    info!("ringbyte stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::tools::{MockMediaDownloader, MockTranscoder};
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn serves_published_downloads() {
        let root = tempfile::tempdir().unwrap();
        let downloads = root.path().join("public").join("downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::write(downloads.join("My Song.mp3"), b"ID3").unwrap();

        let response = app(root.path(), MockMediaDownloader::new(), MockTranscoder::new())
            .oneshot(
                Request::get("/downloads/My%20Song.mp3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"ID3");
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let root = tempfile::tempdir().unwrap();
        let response = app(root.path(), MockMediaDownloader::new(), MockTranscoder::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let response = app(root.path(), MockMediaDownloader::new(), MockTranscoder::new())
            .oneshot(Request::get("/nothing-here").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
