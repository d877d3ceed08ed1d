use crate::error::{AppError, SplitError};
use crate::models::{PageTextResponse, PreviewChapter, PreviewResponse, UploadResponse};
use crate::services::chapterizer::detect_chapters;
use crate::services::pdf::{PageSource, PdfDocument};
use crate::services::render::{self, DEFAULT_DPI};
use crate::services::splitter::{build_chapter_ranges, package_ranges};
use crate::services::storage::UploadStore;
use crate::services::text;
use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use http::{HeaderValue, header};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::LazyLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const UPLOAD_FIELD: &str = "file";

static NON_ASCII_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid ascii name pattern"));

#[derive(Clone)]
pub struct AppState {
    pub store: UploadStore,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/preview", post(preview))
        .route("/upload", post(upload_and_split))
        .route("/page_image", get(page_image))
        .route("/page_text", get(page_text))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::AllowMethods::any())
                .allow_headers(tower_http::cors::AllowHeaders::any()),
        )
}

async fn index() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>PDF Chapter Splitter</title>
    <meta charset="utf-8">
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; }
        .info-box { background-color: #f0f8ff; padding: 20px; border-radius: 8px; margin: 20px 0; }
        .endpoint { background-color: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 4px; font-family: monospace; }
    </style>
</head>
<body>
    <h1>PDF Chapter Splitter</h1>

    <div class="info-box">
        <p>Upload a Japanese textbook PDF and get one PDF per chapter (第N章) back as a zip archive.</p>
        <p>Table-of-contents pages are ignored and chapter cover pages are kept with their chapter.</p>
    </div>

    <h2>Available Endpoints:</h2>
    <div class="endpoint">GET /health - Health check</div>
    <div class="endpoint">POST /preview - Detect chapters and return their page ranges (multipart field 'file')</div>
    <div class="endpoint">POST /upload - Split into chapters and download a zip (multipart field 'file')</div>
    <div class="endpoint">GET /page_image?filename=&amp;page=&amp;dpi=130 - PNG of an uploaded page</div>
    <div class="endpoint">GET /page_text?filename=&amp;page= - Extracted text of an uploaded page</div>
</body>
</html>
"#,
    )
}

async fn health_check() -> &'static str {
    "OK"
}

/// Pulls the `file` field out of the form and stores it.
async fn receive_upload(
    store: &UploadStore,
    multipart: &mut Multipart,
) -> Result<(String, std::path::PathBuf), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("upload has no file name".to_string()))?;
        let data: Bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let path = store.save(&filename, &data).await?;
        return Ok((filename, path));
    }

    Err(AppError::BadRequest(format!(
        "missing multipart field '{}'",
        UPLOAD_FIELD
    )))
}

async fn preview(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PreviewResponse>, AppError> {
    let (filename, path) = receive_upload(&state.store, &mut multipart).await?;

    let ranges = tokio::task::spawn_blocking(move || -> Result<_, SplitError> {
        let doc = PdfDocument::open(&path)?;
        let chapters = detect_chapters(&doc);
        if chapters.is_empty() {
            return Ok(Vec::new());
        }
        Ok(build_chapter_ranges(&doc, &chapters))
    })
    .await??;

    tracing::info!("Preview of {}: {} chapters", filename, ranges.len());

    Ok(Json(PreviewResponse {
        filename,
        chapters: ranges.into_iter().map(PreviewChapter::from).collect(),
    }))
}

async fn upload_and_split(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let (filename, path) = receive_upload(&state.store, &mut multipart).await?;

    let archive = tokio::task::spawn_blocking(move || -> Result<_, SplitError> {
        let doc = PdfDocument::open(&path)?;
        let chapters = detect_chapters(&doc);
        if chapters.is_empty() {
            return Ok(None);
        }
        let ranges = build_chapter_ranges(&doc, &chapters);
        package_ranges(&doc, &ranges).map(Some)
    })
    .await??;

    let Some(archive) = archive else {
        tracing::info!("No chapters detected in {}", filename);
        return Ok(Json(UploadResponse {
            message: "uploaded".to_string(),
            filename,
            chapters: Vec::new(),
        })
        .into_response());
    };

    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    filename: String,
    page: usize,
    dpi: Option<u32>,
}

async fn page_image(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let path = state.store.locate(&query.filename)?;
    let dpi = query.dpi.unwrap_or(DEFAULT_DPI);

    let png =
        tokio::task::spawn_blocking(move || render::render_page(&path, query.page, dpi)).await??;

    Ok(([(header::CONTENT_TYPE, HeaderValue::from_static("image/png"))], png).into_response())
}

async fn page_text(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageTextResponse>, AppError> {
    let path = state.store.locate(&query.filename)?;
    let page = query.page;

    let raw = tokio::task::spawn_blocking(move || -> Result<_, SplitError> {
        let doc = PdfDocument::open(&path)?;
        tracing::debug!("Reading page {} of {}", page, doc.page_count());
        doc.checked_page_text(page)
    })
    .await??;

    Ok(Json(PageTextResponse {
        filename: query.filename,
        page,
        text: text::normalize(Some(&raw)),
    }))
}

/// `attachment` disposition for `{stem}_chapters.zip` with an ASCII fallback and an
/// RFC 5987 UTF-8 name.
pub fn content_disposition(upload_name: &str) -> String {
    let stem = Path::new(upload_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let zip_name = format!("{}_chapters.zip", stem);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback_filename(&zip_name),
        urlencoding::encode(&zip_name)
    )
}

pub fn ascii_fallback_filename(name: &str) -> String {
    let replaced = NON_ASCII_NAME_RE.replace_all(name, "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        "chapters.zip".to_string()
    } else {
        trimmed.to_string()
    }
}
