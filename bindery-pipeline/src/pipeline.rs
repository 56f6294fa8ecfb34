//! Generate-and-merge orchestration.
//!
//! [`generate_and_merge`] runs the full flow: open the template, render the
//! whole batch into a transient workspace, merge the rendered documents and
//! persist the result atomically. Transient documents never outlive the
//! invocation, whichever way it exits.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use bindery_composer::{
    merge, merge_with_sections, with_section_heading, DocumentSection, MergeOptions,
    SeparatorKind,
};
use bindery_renderer::{RenderContext, TemplateRenderer};

use crate::batch::{render_batch, BatchItem};
use crate::error::{io_err, BatchFailure, PipelineError};
use crate::workspace::BatchWorkspace;

// ---------------------------------------------------------------------------
// Options & report
// ---------------------------------------------------------------------------

/// How per-item render failures affect the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelinePolicy {
    /// Any failed item aborts the run before merging.
    #[default]
    FailFast,
    /// Merge whatever rendered; failed items are reported as skipped.
    BestEffort,
}

/// Per-invocation configuration. There is no process-global state: every
/// run carries its own options.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub policy: PipelinePolicy,
    /// Separator between adjacent documents; `None` merges back to back.
    pub separator: Option<SeparatorKind>,
    /// One heading title per context. When set, the merge is sectioned.
    pub section_titles: Option<Vec<String>>,
    /// Worker threads for batch rendering; 0 or 1 renders sequentially.
    pub concurrency: usize,
    /// Directory to hold the transient workspace; system temp dir if `None`.
    pub temp_area: Option<PathBuf>,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub output_path: PathBuf,
    /// Documents that made it into the output.
    pub merged_count: usize,
    /// Items skipped under the best-effort policy; empty under fail-fast.
    pub skipped: Vec<BatchFailure>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Render one document per context and merge them, in input order, into a
/// single document at `output`.
pub fn generate_and_merge(
    template: &Path,
    contexts: &[RenderContext],
    output: &Path,
    options: &PipelineOptions,
) -> Result<PipelineReport, PipelineError> {
    if contexts.is_empty() {
        return Err(PipelineError::EmptyBatch);
    }
    if let Some(titles) = &options.section_titles {
        if titles.len() != contexts.len() {
            return Err(PipelineError::TitleCountMismatch {
                titles: titles.len(),
                contexts: contexts.len(),
            });
        }
    }

    tracing::info!(
        template = %template.display(),
        contexts = contexts.len(),
        policy = ?options.policy,
        "pipeline started"
    );

    let renderer = TemplateRenderer::open(template)?;
    let workspace = BatchWorkspace::create(options.temp_area.as_deref())?;
    let items = render_batch(&renderer, contexts, &workspace, options.concurrency)?;
    let (rendered, skipped) = split_outcomes(items);

    match options.policy {
        PipelinePolicy::FailFast if !skipped.is_empty() => {
            return Err(PipelineError::PartialBatchFailure { failures: skipped });
        }
        PipelinePolicy::BestEffort if rendered.is_empty() => {
            return Err(PipelineError::PartialBatchFailure { failures: skipped });
        }
        _ => {}
    }

    let merged = compose(&rendered, options)?;
    persist_atomic(output, &merged)?;

    // The output is already safe; a cleanup failure is not worth failing for.
    if let Err(err) = workspace.close() {
        tracing::warn!(error = %err, "workspace cleanup failed");
    }

    let report = PipelineReport {
        output_path: output.to_path_buf(),
        merged_count: rendered.len(),
        skipped,
    };
    tracing::info!(
        output = %report.output_path.display(),
        merged = report.merged_count,
        skipped = report.skipped.len(),
        "pipeline finished"
    );
    Ok(report)
}

/// Render a single context and persist it. No workspace, no merge.
pub fn generate_single(
    template: &Path,
    context: &RenderContext,
    output: &Path,
) -> Result<PathBuf, PipelineError> {
    let renderer = TemplateRenderer::open(template)?;
    let bytes = renderer.render(context)?;
    persist_atomic(output, &bytes)?;
    tracing::info!(output = %output.display(), "rendered single document");
    Ok(output.to_path_buf())
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn split_outcomes(items: Vec<BatchItem>) -> (Vec<(usize, PathBuf)>, Vec<BatchFailure>) {
    let mut rendered = Vec::new();
    let mut skipped = Vec::new();
    for item in items {
        match item.outcome {
            Ok(path) => rendered.push((item.index, path)),
            Err(err) => skipped.push(BatchFailure::from_error(item.index, &err)),
        }
    }
    (rendered, skipped)
}

fn compose(
    rendered: &[(usize, PathBuf)],
    options: &PipelineOptions,
) -> Result<Vec<u8>, PipelineError> {
    if let [(index, only)] = rendered {
        // Merging one document is a no-op the composer refuses. It still gets
        // its heading in a sectioned run; otherwise pass it through as-is.
        if let Some(titles) = &options.section_titles {
            tracing::debug!(path = %only.display(), "single document, sectioned passthrough");
            let section = DocumentSection {
                path: only.clone(),
                title: titles[*index].clone(),
            };
            return Ok(with_section_heading(&section)?);
        }
        tracing::debug!(path = %only.display(), "single document, skipping merge");
        return fs::read(only).map_err(|e| io_err(only, e));
    }

    let bytes = if let Some(titles) = &options.section_titles {
        let sections: Vec<DocumentSection> = rendered
            .iter()
            .map(|(index, path)| DocumentSection {
                path: path.clone(),
                title: titles[*index].clone(),
            })
            .collect();
        merge_with_sections(&sections)?
    } else {
        let paths: Vec<PathBuf> = rendered.iter().map(|(_, path)| path.clone()).collect();
        merge(
            &paths,
            &MergeOptions {
                separator: options.separator,
            },
        )?
    };
    Ok(bytes)
}

/// Write `bytes` to `path` through a temporary sibling and an atomic rename,
/// so a crash mid-write never leaves a truncated output behind.
fn persist_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }
    let tmp = PathBuf::from(format!("{}.bindery.tmp", path.display()));
    fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
