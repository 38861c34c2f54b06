//! Request handlers. Each upload runs the whole decode → predict → assemble
//! flow once, on the blocking pool, and nothing is kept after the response.

use super::error::{AppError, AppResult};
use super::render::{Page, PageBody};
use super::AppState;
use crate::scoring::{PredictionResult, ScoringError, ScoringPipeline, Summary, EXPORT_FILE_NAME};
use crate::table::{FeatureTable, Value};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

/// Multipart field carrying the CSV.
const FILE_FIELD: &str = "file";

pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// `None` when the form was submitted without choosing a file.
async fn read_upload(multipart: &mut Multipart) -> AppResult<Option<Upload>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        if file_name.is_empty() && bytes.is_empty() {
            continue;
        }
        upload = Some(Upload { file_name, bytes });
    }
    Ok(upload)
}

enum Outcome {
    Scored {
        preview: FeatureTable,
        result: PredictionResult,
        csv: Vec<u8>,
    },
    Failed {
        preview: Option<FeatureTable>,
        error: ScoringError,
    },
}

/// Single catch boundary for decode, predict, assemble and export.
fn process(pipeline: &ScoringPipeline, bytes: &[u8], preview_rows: usize) -> Outcome {
    let table = match pipeline.decode(bytes) {
        Ok(t) => t,
        Err(error) => return Outcome::Failed { preview: None, error },
    };
    let preview = table.head(preview_rows);
    let scored = pipeline
        .score(&table)
        .and_then(|result| result.to_csv().map(|csv| (result, csv)));
    match scored {
        Ok((result, csv)) => Outcome::Scored { preview, result, csv },
        Err(error) => Outcome::Failed {
            preview: Some(preview),
            error,
        },
    }
}

async fn score_upload(state: &AppState, upload: Upload) -> AppResult<Outcome> {
    let upload_id = Uuid::new_v4();
    let sha256 = format!("{:x}", Sha256::digest(&upload.bytes));
    info!(
        %upload_id,
        file = %upload.file_name,
        bytes = upload.bytes.len(),
        sha256 = %sha256,
        "upload received"
    );

    let pipeline = state.pipeline.clone();
    let preview_rows = state.render.preview_rows;
    let bytes = upload.bytes;
    let outcome = tokio::task::spawn_blocking(move || process(&pipeline, &bytes, preview_rows)).await?;

    match &outcome {
        Outcome::Scored { result, .. } => info!(
            %upload_id,
            rows = result.summary.total,
            normal = result.summary.normal,
            intrusion = result.summary.intrusion,
            "upload scored"
        ),
        Outcome::Failed { error, .. } => warn!(
            %upload_id,
            stage = error.kind(),
            error = %error,
            "upload scoring failed"
        ),
    }
    Ok(outcome)
}

fn page_html(state: &AppState, body: PageBody<'_>) -> Html<String> {
    let classifier = state.pipeline.classifier();
    Html(
        Page {
            model_name: classifier.name(),
            expected_columns: classifier.schema().map(|s| s.len()),
            body,
        }
        .render(),
    )
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    page_html(&state, PageBody::AwaitingUpload)
}

pub async fn upload_page(State(state): State<AppState>, mut multipart: Multipart) -> AppResult<Response> {
    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return Ok(page_html(&state, PageBody::AwaitingUpload).into_response()),
        Err(AppError::Upload { status, message }) => {
            warn!(%status, error = %message, "upload rejected");
            let page = page_html(&state, PageBody::Rejected { message: &message });
            return Ok((status, page).into_response());
        }
        Err(e) => return Err(e),
    };

    let html = match score_upload(&state, upload).await? {
        Outcome::Scored { preview, result, csv } => page_html(
            &state,
            PageBody::Scored {
                preview: &preview,
                result: &result,
                result_rows: state.render.result_rows,
                csv: &csv,
            },
        ),
        Outcome::Failed { preview, error } => page_html(
            &state,
            PageBody::Failed {
                preview: preview.as_ref(),
                error: &error,
            },
        ),
    };
    Ok(html.into_response())
}

#[derive(Serialize)]
pub struct PredictionsResponse {
    pub model: String,
    pub summary: Summary,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

async fn scored_upload(state: &AppState, mut multipart: Multipart) -> AppResult<(PredictionResult, Vec<u8>)> {
    let upload = read_upload(&mut multipart).await?.ok_or(AppError::MissingUpload)?;
    match score_upload(state, upload).await? {
        Outcome::Scored { result, csv, .. } => Ok((result, csv)),
        Outcome::Failed { error, .. } => Err(error.into()),
    }
}

pub async fn predictions_json(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<PredictionsResponse>> {
    let (result, _) = scored_upload(&state, multipart).await?;
    Ok(Json(PredictionsResponse {
        model: state.pipeline.classifier().name().to_string(),
        summary: result.summary,
        columns: result.table.columns().to_vec(),
        rows: result.table.rows().to_vec(),
    }))
}

pub async fn predictions_csv(State(state): State<AppState>, multipart: Multipart) -> AppResult<Response> {
    let (_, csv) = scored_upload(&state, multipart).await?;
    let disposition = format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: String,
    timestamp: i64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: state.pipeline.classifier().name().to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
