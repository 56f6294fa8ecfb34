//! HTTP routes: template rendering, batch rendering, merging, the full
//! pipeline, and template validation.
//!
//! Uploads arrive as multipart form data. Files that must exist on disk for
//! the composer (merge and pipeline inputs) are written under the configured
//! upload directory and deleted once the request finishes, success or not.
//! Generated documents are kept under the output directory and also returned
//! as a download.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use bindery_composer::{
    merge, merge_with_sections, DocumentSection, MergeOptions, SeparatorKind,
};
use bindery_core::RenderContext;
use bindery_pipeline::{
    generate_and_merge, render_batch, BatchFailure, BatchWorkspace, PipelineOptions,
    PipelinePolicy,
};
use bindery_renderer::{TemplateRenderer, ValidationReport};

use crate::error::{io_err, ApiError, ApiResponse};

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Uploads above this size are rejected before any processing.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

// ---------------------------------------------------------------------------
// State & router
// ---------------------------------------------------------------------------

pub struct ServerConfig {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub temp_area: Option<PathBuf>,
    pub concurrency: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/render", post(render_document))
        .route("/api/render-batch", post(render_batch_documents))
        .route("/api/merge", post(merge_documents))
        .route("/api/pipeline", post(run_pipeline))
        .route("/api/validate-template", post(validate_template))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("OK"))
}

/// `POST /api/render` — multipart `template` file + `context` JSON field.
/// Responds with the rendered document as an attachment.
async fn render_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = collect_form(multipart).await?;
    let template = form.take_file("template")?;
    let context = RenderContext::from_json(&form.require_text("context")?)?;

    let config = state.config.clone();
    let (file_name, bytes) = tokio::task::spawn_blocking(move || {
        let renderer = TemplateRenderer::from_bytes(&template.bytes)?;
        let bytes = renderer.render(&context)?;
        let file_name = format!("rendered_{}.docx", stamp());
        write_output(&config, &file_name, &bytes)?;
        Ok::<_, ApiError>((file_name, bytes))
    })
    .await
    .map_err(|err| ApiError::Task(err.to_string()))??;

    tracing::info!(file = %file_name, "rendered document");
    Ok(docx_response(&file_name, bytes))
}

#[derive(Debug, Serialize)]
struct BatchRenderReport {
    total: usize,
    rendered: usize,
    documents: Vec<BatchDocumentInfo>,
    failures: Vec<BatchFailure>,
}

#[derive(Debug, Serialize)]
struct BatchDocumentInfo {
    index: usize,
    file: String,
}

/// `POST /api/render-batch` — multipart `template` file + `contexts` JSON
/// array. Renders one document per context into the output directory and
/// responds with a per-item report instead of a download.
async fn render_batch_documents(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<BatchRenderReport>>, ApiError> {
    let mut form = collect_form(multipart).await?;
    let template = form.take_file("template")?;
    let contexts = parse_contexts(&form.require_text("contexts")?)?;
    if contexts.is_empty() {
        return Err(ApiError::BadRequest(
            "field 'contexts' must not be empty".into(),
        ));
    }

    let config = state.config.clone();
    let report = tokio::task::spawn_blocking(move || {
        let renderer = TemplateRenderer::from_bytes(&template.bytes)?;
        let workspace = BatchWorkspace::create(config.temp_area.as_deref())?;
        let items = render_batch(&renderer, &contexts, &workspace, config.concurrency)?;

        let run_stamp = stamp();
        let mut documents = Vec::new();
        let mut failures = Vec::new();
        for item in items {
            match item.outcome {
                Ok(path) => {
                    let file = format!("batch_{run_stamp}_{:04}.docx", item.index);
                    let target = config.output_dir.join(&file);
                    fs::copy(&path, &target).map_err(|e| io_err(&target, e))?;
                    documents.push(BatchDocumentInfo {
                        index: item.index,
                        file,
                    });
                }
                Err(err) => failures.push(BatchFailure::from_error(item.index, &err)),
            }
        }
        if let Err(err) = workspace.close() {
            tracing::warn!(error = %err, "workspace cleanup failed");
        }
        Ok::<_, ApiError>(BatchRenderReport {
            total: contexts.len(),
            rendered: documents.len(),
            documents,
            failures,
        })
    })
    .await
    .map_err(|err| ApiError::Task(err.to_string()))??;

    tracing::info!(
        total = report.total,
        rendered = report.rendered,
        "batch render finished"
    );
    Ok(Json(ApiResponse::success(report)))
}

/// `POST /api/merge` — multipart: two or more `documents` files, optional
/// `page_breaks` boolean (default true) and `titles` JSON array. With titles
/// the merge is sectioned; otherwise documents are separated by page breaks.
async fn merge_documents(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = collect_form(multipart).await?;
    let files = form.take_files("documents");
    if files.len() < 2 {
        return Err(ApiError::BadRequest(format!(
            "merge needs at least 2 documents, got {}",
            files.len()
        )));
    }
    let page_breaks = parse_bool_field(&mut form, "page_breaks", true)?;
    let titles = parse_titles(&mut form)?;
    if let Some(titles) = &titles {
        if titles.len() != files.len() {
            return Err(ApiError::BadRequest(format!(
                "{} titles supplied for {} documents",
                titles.len(),
                files.len()
            )));
        }
    }

    let count = files.len();
    let config = state.config.clone();
    let (file_name, bytes) =
        tokio::task::spawn_blocking(move || merge_uploads(&config, &files, page_breaks, titles))
            .await
            .map_err(|err| ApiError::Task(err.to_string()))??;

    tracing::info!(file = %file_name, documents = count, "merged documents");
    Ok(docx_response(&file_name, bytes))
}

/// `POST /api/pipeline` — multipart `template` file + `contexts` JSON array,
/// optional `best_effort` / `page_breaks` booleans and `titles` array.
/// Responds with the merged document as an attachment.
async fn run_pipeline(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = collect_form(multipart).await?;
    let template = form.take_file("template")?;
    let contexts = parse_contexts(&form.require_text("contexts")?)?;
    let best_effort = parse_bool_field(&mut form, "best_effort", false)?;
    let page_breaks = parse_bool_field(&mut form, "page_breaks", true)?;
    let titles = parse_titles(&mut form)?;

    let config = state.config.clone();
    let (file_name, bytes, report) = tokio::task::spawn_blocking(move || {
        let run_stamp = stamp();
        let template_path = config
            .upload_dir
            .join(format!("template_{run_stamp}.docx"));
        fs::write(&template_path, &template.bytes).map_err(|e| io_err(&template_path, e))?;

        let file_name = format!("final_{run_stamp}.docx");
        let output_path = config.output_dir.join(&file_name);
        let options = PipelineOptions {
            policy: if best_effort {
                PipelinePolicy::BestEffort
            } else {
                PipelinePolicy::FailFast
            },
            separator: page_breaks.then_some(SeparatorKind::PageBreak),
            section_titles: titles,
            concurrency: config.concurrency,
            temp_area: config.temp_area.clone(),
        };
        let outcome = generate_and_merge(&template_path, &contexts, &output_path, &options);
        remove_files(&[template_path]);

        let report = outcome?;
        let bytes = fs::read(&output_path).map_err(|e| io_err(&output_path, e))?;
        Ok::<_, ApiError>((file_name, bytes, report))
    })
    .await
    .map_err(|err| ApiError::Task(err.to_string()))??;

    tracing::info!(
        file = %file_name,
        merged = report.merged_count,
        skipped = report.skipped.len(),
        "pipeline finished"
    );
    Ok(docx_response(&file_name, bytes))
}

/// `POST /api/validate-template` — multipart `template` file + `placeholders`
/// JSON array of required names. Responds with the validation report.
async fn validate_template(
    multipart: Multipart,
) -> Result<Json<ApiResponse<ValidationReport>>, ApiError> {
    let mut form = collect_form(multipart).await?;
    let template = form.take_file("template")?;
    let required_text = form.require_text("placeholders")?;
    let required: Vec<String> = serde_json::from_str(&required_text).map_err(|e| {
        ApiError::BadRequest(format!(
            "field 'placeholders' must be a JSON array of strings: {e}"
        ))
    })?;

    let report = tokio::task::spawn_blocking(move || {
        let renderer = TemplateRenderer::from_bytes(&template.bytes)?;
        Ok::<_, ApiError>(renderer.validate(&required))
    })
    .await
    .map_err(|err| ApiError::Task(err.to_string()))??;
    Ok(Json(ApiResponse::success(report)))
}

// ---------------------------------------------------------------------------
// Multipart plumbing
// ---------------------------------------------------------------------------

struct UploadedFile {
    field: String,
    file_name: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct FormData {
    files: Vec<UploadedFile>,
    fields: BTreeMap<String, String>,
}

impl FormData {
    fn take_file(&mut self, name: &str) -> Result<UploadedFile, ApiError> {
        let at = self
            .files
            .iter()
            .position(|f| f.field == name)
            .ok_or_else(|| ApiError::BadRequest(format!("missing file field '{name}'")))?;
        Ok(self.files.remove(at))
    }

    /// Remove and return every upload under `name`, preserving order.
    fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let (matched, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.field == name);
        self.files = rest;
        matched
    }

    fn take_text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    fn require_text(&mut self, name: &str) -> Result<String, ApiError> {
        self.take_text(name)
            .ok_or_else(|| ApiError::BadRequest(format!("missing field '{name}'")))
    }
}

async fn collect_form(mut multipart: Multipart) -> Result<FormData, ApiError> {
    let mut form = FormData::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed reading upload '{name}': {e}")))?;
            tracing::debug!(field = %name, file = %file_name, size = bytes.len(), "received upload");
            form.files.push(UploadedFile {
                field: name,
                file_name,
                bytes: bytes.to_vec(),
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed reading field '{name}': {e}")))?;
            form.fields.insert(name, text);
        }
    }
    Ok(form)
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

fn parse_contexts(text: &str) -> Result<Vec<RenderContext>, ApiError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(text)
        .map_err(|e| ApiError::BadRequest(format!("field 'contexts' must be a JSON array: {e}")))?;
    values
        .into_iter()
        .map(|value| RenderContext::from_value(value).map_err(ApiError::from))
        .collect()
}

fn parse_bool_field(form: &mut FormData, name: &str, default: bool) -> Result<bool, ApiError> {
    match form.take_text(name) {
        None => Ok(default),
        Some(text) => match text.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(ApiError::BadRequest(format!(
                "field '{name}' must be a boolean, got '{other}'"
            ))),
        },
    }
}

fn parse_titles(form: &mut FormData) -> Result<Option<Vec<String>>, ApiError> {
    match form.take_text("titles") {
        None => Ok(None),
        Some(text) => {
            let titles: Vec<String> = serde_json::from_str(&text).map_err(|e| {
                ApiError::BadRequest(format!(
                    "field 'titles' must be a JSON array of strings: {e}"
                ))
            })?;
            Ok(Some(titles))
        }
    }
}

// ---------------------------------------------------------------------------
// Disk plumbing
// ---------------------------------------------------------------------------

fn stamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn write_output(config: &ServerConfig, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    let path = config.output_dir.join(file_name);
    fs::write(&path, bytes).map_err(|e| io_err(&path, e))?;
    Ok(path)
}

fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %err, "failed to delete upload");
        }
    }
}

/// Persist uploaded documents, merge them, and delete the uploads whether or
/// not the merge succeeded.
fn merge_uploads(
    config: &ServerConfig,
    files: &[UploadedFile],
    page_breaks: bool,
    titles: Option<Vec<String>>,
) -> Result<(String, Vec<u8>), ApiError> {
    let run_stamp = stamp();
    let mut paths = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let path = config
            .upload_dir
            .join(format!("upload_{run_stamp}_{index:04}.docx"));
        if let Err(err) = fs::write(&path, &file.bytes) {
            remove_files(&paths);
            return Err(io_err(&path, err));
        }
        tracing::debug!(original = %file.file_name, path = %path.display(), "stored upload");
        paths.push(path);
    }

    let outcome = match titles {
        Some(titles) => {
            let sections: Vec<DocumentSection> = paths
                .iter()
                .zip(titles)
                .map(|(path, title)| DocumentSection {
                    path: path.clone(),
                    title,
                })
                .collect();
            merge_with_sections(&sections).map_err(ApiError::from)
        }
        None => {
            let options = MergeOptions {
                separator: page_breaks.then_some(SeparatorKind::PageBreak),
            };
            merge(&paths, &options).map_err(ApiError::from)
        }
    };
    remove_files(&paths);

    let bytes = outcome?;
    let file_name = format!("merged_{run_stamp}.docx");
    write_output(config, &file_name, &bytes)?;
    Ok((file_name, bytes))
}

fn docx_response(file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_parse_as_mappings() {
        let contexts = parse_contexts(r#"[{"a": 1}, {"b": 2}]"#).unwrap();
        assert_eq!(contexts.len(), 2);

        let err = parse_contexts(r#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = parse_contexts(r#"[{"a": 1}, 7]"#).unwrap_err();
        assert!(matches!(err, ApiError::Context(_)));
    }

    #[test]
    fn boolean_fields_accept_true_false_and_digits() {
        let mut form = FormData::default();
        form.fields.insert("flag".into(), "1".into());
        assert!(parse_bool_field(&mut form, "flag", false).unwrap());
        assert!(parse_bool_field(&mut form, "absent", true).unwrap());
        assert!(!parse_bool_field(&mut form, "absent", false).unwrap());

        let mut form = FormData::default();
        form.fields.insert("flag".into(), "yes".into());
        assert!(parse_bool_field(&mut form, "flag", false).is_err());
    }

    #[test]
    fn take_files_keeps_unrelated_uploads() {
        let mut form = FormData::default();
        for (field, file_name) in [("documents", "a.docx"), ("other", "b.docx"), ("documents", "c.docx")]
        {
            form.files.push(UploadedFile {
                field: field.into(),
                file_name: file_name.into(),
                bytes: vec![0],
            });
        }

        let docs = form.take_files("documents");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].file_name, "a.docx");
        assert_eq!(docs[1].file_name, "c.docx");
        assert_eq!(form.files.len(), 1);
    }

    #[test]
    fn stamped_names_carry_the_prefix() {
        let name = format!("rendered_{}.docx", stamp());
        assert!(name.starts_with("rendered_"));
        assert!(name.ends_with(".docx"));
    }
}
