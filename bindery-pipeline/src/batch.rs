//! Ordered batch rendering.

use std::fs;
use std::path::PathBuf;

use rayon::prelude::*;

use bindery_renderer::{RenderContext, TemplateRenderer};

use crate::error::{io_err, PipelineError};
use crate::workspace::BatchWorkspace;

/// Outcome of one batch item, tagged with its input position.
#[derive(Debug)]
pub struct BatchItem {
    pub index: usize,
    pub outcome: Result<PathBuf, PipelineError>,
}

/// Render every context against the template, persisting each success into
/// the workspace as `doc_NNNN.docx`.
///
/// Returns one item per context, in input order. A failed item never aborts
/// the others; callers decide what a failure means for the run. With
/// `concurrency` above 1 the items render on a bounded worker pool, and the
/// results are still collected in input order.
pub fn render_batch(
    renderer: &TemplateRenderer,
    contexts: &[RenderContext],
    workspace: &BatchWorkspace,
    concurrency: usize,
) -> Result<Vec<BatchItem>, PipelineError> {
    let render_one = |(index, context): (usize, &RenderContext)| -> BatchItem {
        let outcome = render_to_workspace(renderer, context, workspace, index);
        if let Err(err) = &outcome {
            tracing::warn!(index, error = %err, "batch item failed");
        }
        BatchItem { index, outcome }
    };

    let items = if concurrency > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .build()
            .map_err(|e| PipelineError::Pool(e.to_string()))?;
        pool.install(|| contexts.par_iter().enumerate().map(render_one).collect())
    } else {
        contexts.iter().enumerate().map(render_one).collect()
    };
    Ok(items)
}

fn render_to_workspace(
    renderer: &TemplateRenderer,
    context: &RenderContext,
    workspace: &BatchWorkspace,
    index: usize,
) -> Result<PathBuf, PipelineError> {
    let bytes = renderer.render(context)?;
    let path = workspace.document_path(index);
    fs::write(&path, bytes).map_err(|e| io_err(&path, e))?;
    tracing::debug!(index, path = %path.display(), "rendered batch item");
    Ok(path)
}
