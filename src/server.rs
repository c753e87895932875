use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::Mutex;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::Config;
use crate::error::CloudError;
use crate::font::{ensure_font_asset, load_font, FontFetcher};
use crate::intake::UploadKind;
use crate::pipeline::{Pipeline, PipelineOutcome, Upload};
use crate::presenter::{log_statuses, render_page, Page, Status};

/// Whether the pipeline can run
pub enum FontState {
    Ready(Arc<Pipeline>),
    /// Font could not be resolved; carries the remediation message.
    Unavailable(String),
}

/// Shared dashboard state
#[derive(Clone)]
pub struct AppState {
    font: Arc<FontState>,
    /// Outcome of start-up font resolution, shown on the landing page
    startup: Arc<Vec<Status>>,
    /// One render at a time
    render_lock: Arc<Mutex<()>>,
    display_size: u32,
}

impl AppState {
    pub fn new(font: FontState, startup: Vec<Status>, display_size: u32) -> Self {
        Self {
            font: Arc::new(font),
            startup: Arc::new(startup),
            render_lock: Arc::new(Mutex::new(())),
            display_size,
        }
    }
}

/// Resolve the font once and build the pipeline. Failures leave the dashboard
/// running in a state that only shows the remediation message.
pub async fn prepare(config: &Config, fetcher: &dyn FontFetcher) -> (FontState, Vec<Status>) {
    let mut statuses = Vec::new();
    let path = &config.font.path;
    let downloading = !path.exists();
    if downloading {
        tracing::info!("'{}' 폰트 파일이 없어 내려받는 중입니다...", path.display());
    }

    let resolved = match ensure_font_asset(path, &config.font.url, fetcher).await {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!("{}", e);
            return (FontState::Unavailable(e.to_string()), statuses);
        }
    };
    if downloading {
        statuses.push(Status::success(format!("'{}' 폰트를 내려받았습니다.", resolved.display())));
    }

    let pipeline = load_font(&resolved)
        .map_err(anyhow::Error::from)
        .and_then(|font| Pipeline::from_config(config, font));

    log_statuses(&statuses);
    match pipeline {
        Ok(pipeline) => (FontState::Ready(Arc::new(pipeline)), statuses),
        Err(e) => {
            tracing::error!("{:#}", e);
            (FontState::Unavailable(format!("{:#}", e)), statuses)
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/", get(index_handler).post(upload_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(trace_layer)
        .with_state(state)
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let mut page = match state.font.as_ref() {
        FontState::Unavailable(message) => Page::unavailable(message.clone()),
        FontState::Ready(_) => Page::prompt(),
    };
    let mut statuses = state.startup.to_vec();
    statuses.append(&mut page.statuses);
    page.statuses = statuses;
    Html(render_page(&page))
}

#[tracing::instrument(skip(state, multipart))]
async fn upload_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    let pipeline = match state.font.as_ref() {
        FontState::Ready(pipeline) => Arc::clone(pipeline),
        FontState::Unavailable(message) => {
            tracing::warn!("Upload rejected: font unavailable");
            let page = Page::unavailable(message.clone());
            return (StatusCode::SERVICE_UNAVAILABLE, Html(render_page(&page))).into_response();
        }
    };

    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(message) => {
            tracing::warn!("Bad upload: {}", message);
            let page = Page {
                statuses: vec![Status::error(message)],
                ..Page::default()
            };
            return (StatusCode::BAD_REQUEST, Html(render_page(&page))).into_response();
        }
    };

    // The guard travels with the render so an abandoned request still holds
    // the slot until its render finishes.
    let guard = Arc::clone(&state.render_lock).lock_owned().await;
    let outcome = match tokio::task::spawn_blocking(move || {
        let outcome = pipeline.run(upload);
        drop(guard);
        outcome
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Render task failed");
            let page = Page {
                statuses: vec![Status::error(format!("워드클라우드 생성 중 오류가 발생했습니다: {}", e))],
                ..Page::default()
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(render_page(&page))).into_response();
        }
    };

    let status = match &outcome {
        PipelineOutcome::Failed(CloudError::Decode(_) | CloudError::ImageDecode(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineOutcome::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    let page = Page::from_outcome(outcome, state.display_size);
    (status, Html(render_page(&page))).into_response()
}

/// Collect the `text` and `mask` fields. Empty file inputs count as absent.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, String> {
    let mut upload = Upload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("업로드를 읽을 수 없습니다: {}", e))?
    {
        let kind = match field.name() {
            Some("text") => UploadKind::Text,
            Some("mask") => UploadKind::Mask,
            other => {
                tracing::debug!(field = ?other, "Skipping unknown field");
                continue;
            }
        };

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| format!("업로드를 읽을 수 없습니다: {}", e))?;

        if file_name.is_empty() && data.is_empty() {
            continue;
        }
        if !file_name.is_empty() && !kind.accepts(&file_name) {
            return Err(format!(
                "지원하지 않는 파일 형식입니다: {} (허용: {})",
                file_name,
                kind.accept_attr()
            ));
        }

        tracing::debug!(?kind, file_name = %file_name, bytes = data.len(), "Received upload");
        match kind {
            UploadKind::Text => upload.text = Some(data.to_vec()),
            UploadKind::Mask => upload.mask = Some(data.to_vec()),
        }
    }

    Ok(upload)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (status, font) = match state.font.as_ref() {
        FontState::Ready(_) => (StatusCode::OK, "ready"),
        FontState::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
    };
    (status, Json(serde_json::json!({ "status": "healthy", "font": font })))
}
