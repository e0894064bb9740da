//! Inference HTTP API
//!
//! ```text
//! fisiotech-api --model-dir ./model --port 5000
//! FISIOTECH_MODEL_DIR=./model fisiotech-api
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fisiotech_ml::{HybridModel, ModelArtifacts};
use log::info;

/// Serve the hybrid movement classifier over HTTP
#[derive(Debug, Parser)]
#[command(name = "fisiotech-api", version, about)]
struct Args {
    /// Bind address
    #[arg(long, env = "FISIOTECH_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port
    #[arg(short, long, env = "FISIOTECH_PORT", default_value_t = 5000)]
    port: u16,

    /// Directory holding scaler.json, encoder.json, extractor.json, classifier.json
    #[arg(short, long, env = "FISIOTECH_MODEL_DIR", default_value = "model")]
    model_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let model = HybridModel::load(&ModelArtifacts::new(&args.model_dir))
        .with_context(|| format!("loading model from {}", args.model_dir.display()))?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    fisiotech_service::serve(listener, Arc::new(model), async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down");
    })
    .await?;

    Ok(())
}
