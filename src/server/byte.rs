//! `POST /api/byte`: YouTube link in, ringtone download links out.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use super::{ApiError, AppState};
use crate::ringtone::DownloadLinks;

#[derive(Debug, Deserialize)]
pub struct ByteRequest {
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn create_ringtone(
    State(state): State<AppState>,
    payload: Result<Json<ByteRequest>, JsonRejection>,
) -> Result<Json<DownloadLinks>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let url = request
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::bad_request("URL is required"))?;

    info!(url, "ringtone requested");

    let links = state.ringtones.make(url).await.map_err(ApiError::Failed)?;
    Ok(Json(links))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::tools::{MockMediaDownloader, MockTranscoder};
    use crate::RingbyteError;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn post_json(body: &str) -> Request<Body> {
        Request::post("/api/byte")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn missing_url_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        for body in [r#"{}"#, r#"{"url":""}"#, r#"{"url":null}"#] {
            let response = app(root.path(), MockMediaDownloader::new(), MockTranscoder::new())
                .oneshot(post_json(body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(body_json(response).await, json!({ "error": "URL is required" }));
        }
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let root = tempfile::tempdir().unwrap();
        let response = app(root.path(), MockMediaDownloader::new(), MockTranscoder::new())
            .oneshot(post_json("{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn returns_links_to_published_files() {
        let root = tempfile::tempdir().unwrap();
        let mut downloader = MockMediaDownloader::new();
        downloader
            .expect_fetch_title()
            .returning(|_| Ok("My: Song?".to_string()));
        downloader
            .expect_extract_audio()
            .times(2)
            .returning(|_, _, _, output_path| {
                std::fs::write(output_path, b"audio")?;
                Ok(())
            });

        let response = app(root.path(), downloader, MockTranscoder::new())
            .oneshot(post_json(r#"{"url":"https://www.youtube.com/watch?v=abc"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "mp3": "/downloads/My Song.mp3", "m4r": "/downloads/My Song.m4r" })
        );

        let downloads = config(root.path()).paths.downloads_dir;
        assert!(downloads.join("My Song.mp3").is_file());
        assert!(downloads.join("My Song.m4r").is_file());
    }

    #[tokio::test]
    async fn tool_failure_message_is_returned() {
        let root = tempfile::tempdir().unwrap();
        let mut downloader = MockMediaDownloader::new();
        downloader.expect_fetch_title().returning(|_| {
            Err(RingbyteError::ExternalTool {
                tool: "yt-dlp".to_string(),
                message: "exited with exit status: 1: ERROR: Unsupported URL".to_string(),
            }
            .into())
        });

        let response = app(root.path(), downloader, MockTranscoder::new())
            .oneshot(post_json(r#"{"url":"https://example.com/nothing"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "yt-dlp failed: exited with exit status: 1: ERROR: Unsupported URL" })
        );
    }
}
