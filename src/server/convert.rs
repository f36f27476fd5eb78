//! `POST /api/convert`: multipart upload in, converted audio out.

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::{ApiError, AppState};
use crate::convert::ConversionRequest;
use crate::tools::AudioFormat;
use crate::RingbyteError;

const CONVERSION_FAILED: &str = "Error converting file";

struct UploadedFile {
    name: String,
    data: Vec<u8>,
}

pub async fn convert_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart
        .map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))?;

    let mut file: Option<UploadedFile> = None;
    let mut format: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(reading_failed)?
    {
        let field_name = field.name().map(str::to_owned);
        let file_name = field.file_name().map(str::to_owned);

        match (field_name.as_deref(), file_name) {
            // Only a part with a filename counts as a file upload
            (Some("file"), Some(name)) => {
                let data = field
                    .bytes()
                    .await
                    .map_err(reading_failed)?;
                file = Some(UploadedFile {
                    name,
                    data: data.to_vec(),
                });
            }
            (Some("format"), _) => {
                let value = field
                    .text()
                    .await
                    .map_err(reading_failed)?;
                format = Some(value);
            }
            (other, _) => {
                debug!(field = ?other, "ignoring multipart field");
            }
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    let format = format
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::bad_request("No output format provided"))?;
    let format = AudioFormat::from_target(format).ok_or_else(|| {
        ApiError::bad_request(RingbyteError::UnsupportedFormat(format.to_string()).to_string())
    })?;

    let converted = state
        .converter
        .convert(ConversionRequest {
            file_name: file.name,
            data: file.data,
            format,
        })
        .await
        .map_err(|e| ApiError::masked(CONVERSION_FAILED, e))?;

    Ok((
        [
            (header::CONTENT_TYPE, converted.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&converted.file_name),
            ),
        ],
        converted.data,
    )
        .into_response())
}

/// Malformed parts are 400; a body over the upload limit is 413
fn reading_failed(e: MultipartError) -> ApiError {
    ApiError::rejected(e.status(), e.body_text())
}

/// `attachment` disposition for `file_name`.
///
/// Non-ASCII names get an ASCII fallback plus an RFC 5987 `filename*` parameter.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .filter(|c| *c != '"' && *c != '\\')
        .collect();

    if fallback == file_name {
        format!("attachment; filename=\"{}\"", file_name)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(file_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::tools::{MockMediaDownloader, MockTranscoder};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    const BOUNDARY: &str = "ringbyte-test-boundary";

    fn multipart_request(file: Option<(&str, &[u8])>, format: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        if let Some((name, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(format) = format {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"format\"\r\n\r\n{format}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/api/convert")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn echo_transcoder() -> MockTranscoder {
        let mut transcoder = MockTranscoder::new();
        transcoder
            .expect_transcode()
            .times(1)
            .returning(|input, output, _, _| {
                std::fs::copy(input, output)?;
                Ok(())
            });
        transcoder
    }

    fn scratch_is_empty(root: &std::path::Path) -> bool {
        std::fs::read_dir(root.join("scratch").join("convert"))
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let response = app(root.path(), MockMediaDownloader::new(), MockTranscoder::new())
            .oneshot(multipart_request(None, Some("mp3")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "No file provided" }));
    }

    #[tokio::test]
    async fn missing_format_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        for format in [None, Some("")] {
            let response = app(root.path(), MockMediaDownloader::new(), MockTranscoder::new())
                .oneshot(multipart_request(Some(("track.wav", b"RIFF")), format))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                body_json(response).await,
                json!({ "error": "No output format provided" })
            );
        }
    }

    #[tokio::test]
    async fn unsupported_format_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let response = app(root.path(), MockMediaDownloader::new(), MockTranscoder::new())
            .oneshot(multipart_request(Some(("track.wav", b"RIFF")), Some("exe")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Unsupported output format: exe" })
        );
    }

    #[tokio::test]
    async fn wav_to_mp3_download() {
        let root = tempfile::tempdir().unwrap();
        let response = app(root.path(), MockMediaDownloader::new(), echo_transcoder())
            .oneshot(multipart_request(Some(("track.wav", b"RIFFdata")), Some("mp3")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mp3");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"track.mp3\""
        );
        assert_eq!(body_bytes(response).await, b"RIFFdata");
        assert!(scratch_is_empty(root.path()));
    }

    #[tokio::test]
    async fn mp3_to_m4r_is_served_as_mp4() {
        let root = tempfile::tempdir().unwrap();
        let response = app(root.path(), MockMediaDownloader::new(), echo_transcoder())
            .oneshot(multipart_request(Some(("clip.mp3", b"ID3")), Some("m4r")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mp4");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"clip.m4r\""
        );
    }

    #[tokio::test]
    async fn transcode_failure_is_masked() {
        let root = tempfile::tempdir().unwrap();
        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().returning(|_, _, _, _| {
            Err(RingbyteError::ExternalTool {
                tool: "ffmpeg".to_string(),
                message: "exited with exit status: 1: /secret/path: Invalid data".to_string(),
            }
            .into())
        });

        let response = app(root.path(), MockMediaDownloader::new(), transcoder)
            .oneshot(multipart_request(Some(("notes.txt", b"hello")), Some("wav")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "error": "Error converting file" }));
        assert!(scratch_is_empty(root.path()));
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let root = tempfile::tempdir().unwrap();
        let mut config = config(root.path());
        config.server.max_upload_mb = 1;
        let data = vec![0u8; 2 * 1024 * 1024];

        let response = app_with_config(config, MockMediaDownloader::new(), MockTranscoder::new())
            .oneshot(multipart_request(Some(("big.wav", data.as_slice())), Some("mp3")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(scratch_is_empty(root.path()));
    }

    #[tokio::test]
    async fn non_multipart_body_is_bad_request() {
        let root = tempfile::tempdir().unwrap();
        let request = Request::post("/api/convert")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app(root.path(), MockMediaDownloader::new(), MockTranscoder::new())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn content_disposition_for_non_ascii_names() {
        assert_eq!(
            content_disposition("track.mp3"),
            "attachment; filename=\"track.mp3\""
        );
        assert_eq!(
            content_disposition("café.m4r"),
            "attachment; filename=\"caf_.m4r\"; filename*=UTF-8''caf%C3%A9.m4r"
        );
    }
}
