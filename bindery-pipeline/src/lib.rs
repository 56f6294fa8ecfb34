//! Batch rendering and generate-and-merge orchestration.
//!
//! The pipeline ties the renderer and the composer together: render one
//! document per context into a transient workspace, merge the results in
//! input order, persist the merged document atomically and clean the
//! workspace up. [`generate_single`] covers the one-context case without
//! a workspace or a merge.

pub mod batch;
pub mod error;
pub mod pipeline;
pub mod workspace;

pub use batch::{render_batch, BatchItem};
pub use error::{BatchFailure, PipelineError};
pub use pipeline::{
    generate_and_merge, generate_single, PipelineOptions, PipelinePolicy, PipelineReport,
};
pub use workspace::BatchWorkspace;
