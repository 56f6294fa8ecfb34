//! Bindery — DOCX templating, batch rendering and merging over HTTP.
//!
//! # Usage
//!
//! ```text
//! bindery [--port 3000] [--upload-dir uploads] [--output-dir outputs]
//!         [--temp-area <dir>] [--concurrency 1]
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use bindery_server::{create_router, AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "bindery",
    version,
    about = "DOCX templating, batch rendering and merging over HTTP",
    long_about = None,
)]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Directory holding uploads while a request is processed.
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,

    /// Directory where generated documents are kept.
    #[arg(long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Directory for transient batch workspaces; system temp dir if unset.
    #[arg(long)]
    temp_area: Option<PathBuf>,

    /// Worker threads for batch rendering; 1 renders sequentially.
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    fs::create_dir_all(&cli.upload_dir)
        .with_context(|| format!("creating upload dir {}", cli.upload_dir.display()))?;
    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating output dir {}", cli.output_dir.display()))?;

    let state = AppState {
        config: Arc::new(ServerConfig {
            upload_dir: cli.upload_dir,
            output_dir: cli.output_dir,
            temp_area: cli.temp_area,
            concurrency: cli.concurrency,
        }),
    };
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "bindery server listening");
    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
