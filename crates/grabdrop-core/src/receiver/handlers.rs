//! Receiver endpoint handlers.

#![allow(clippy::missing_errors_doc)]

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::{Path as UrlPath, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use axum_extra::extract::Multipart;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use super::error::{ApiError, ApiResult};
use super::ReceiverState;
use crate::transfer::http::UPLOAD_FIELD;

/// Upper bound on collision suffixes tried before giving up.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Body of `GET /ping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    /// Always `"ok"`
    pub status: String,
}

/// Body of a successful `POST /upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Always `"success"`
    pub status: String,
    /// Name the file was stored under
    pub filename: String,
    /// Full path of the stored file
    pub path: String,
}

/// GET /ping - Liveness check.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok".to_string(),
    })
}

/// POST /upload - Store the `file` field of a multipart body.
pub async fn upload(
    State(state): State<ReceiverState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        if original.is_empty() {
            return Err(ApiError::bad_request("No selected file"));
        }
        let name = sanitize_file_name(&original)
            .ok_or_else(|| ApiError::bad_request(format!("invalid file name: {original}")))?;

        let (path, mut file) = create_unique(&state.upload_dir, &name).await?;
        let mut written: u64 = 0;
        let copied = async {
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<_, ApiError>(())
        }
        .await;

        if let Err(e) = copied {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            tracing::warn!(file = %original, "Upload aborted: {}", e.error);
            return Err(e);
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        tracing::info!(file = %filename, bytes = written, "File received");

        return Ok(Json(UploadResponse {
            status: "success".to_string(),
            filename,
            path: path.to_string_lossy().to_string(),
        }));
    }

    Err(ApiError::bad_request("No file part"))
}

/// GET /download/{name} - Stream a previously received file.
pub async fn download(
    State(state): State<ReceiverState>,
    UrlPath(name): UrlPath<String>,
) -> ApiResult<Response> {
    let not_found = || ApiError::not_found("File not found");

    let name = sanitize_file_name(&name).ok_or_else(not_found)?;
    let path = state.upload_dir.join(&name);

    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(not_found());
    }

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        )
        .header(header::CONTENT_LENGTH, metadata.len())
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(format!("failed to build response: {e}")))
}

fn multipart_error(e: axum_extra::extract::multipart::MultipartError) -> ApiError {
    ApiError::new(e.status(), format!("Failed to read upload: {}", e.body_text()))
}

/// Reduce a client-supplied name to a safe single path component.
///
/// Keeps ASCII letters, digits, `.`, `-` and `_`; whitespace becomes `_`
/// and everything else is dropped. Leading dots are stripped so the result
/// can never be hidden, `.` or `..`. Returns `None` if nothing is left.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']);

    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Candidate name for the `attempt`-th collision: `stem_N.ext`.
fn numbered_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map_or_else(|| name.to_string(), |s| s.to_string_lossy().to_string());
    match path.extension() {
        Some(ext) => format!("{stem}_{attempt}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{attempt}"),
    }
}

/// Create a new file named `name`, or `name_1`, `name_2`, ... on collision.
async fn create_unique(dir: &Path, name: &str) -> ApiResult<(PathBuf, File)> {
    tokio::fs::create_dir_all(dir).await?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(numbered_name(name, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
    }
    Err(ApiError::internal(format!("too many files named {name}")))
}
