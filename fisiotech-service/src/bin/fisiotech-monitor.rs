//! Headless sensor monitor
//!
//! ```text
//! fisiotech-monitor --port /dev/ttyUSB0 --api-url http://127.0.0.1:5000
//! fisiotech-monitor --port tcp://bridge.local:4000 --model-dir ./model --json
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use fisiotech_connectors::http::{HttpConfig, HttpInferenceClient};
use fisiotech_connectors::DeviceLinkOpener;
use fisiotech_core::stream::LinkConfig;
use fisiotech_core::{ConnectionState, InferenceClient, LinkTarget, Session, SessionConfig};
use fisiotech_ml::{HybridModel, LocalInferenceClient, ModelArtifacts};
use fisiotech_service::MonitorObserver;
use log::info;

/// Classify a live sensor stream and report its stability
#[derive(Debug, Parser)]
#[command(name = "fisiotech-monitor", version, about)]
#[command(group(ArgGroup::new("backend").required(true).args(["api_url", "model_dir"])))]
struct Args {
    /// Serial port (`/dev/ttyUSB0`, `COM3`) or `tcp://host:port`
    #[arg(short, long, env = "FISIOTECH_PORT_NAME")]
    port: String,

    /// Serial baud rate
    #[arg(short, long, env = "FISIOTECH_BAUD", default_value_t = LinkTarget::DEFAULT_BAUD)]
    baud: u32,

    /// Remote inference API
    #[arg(long, env = "FISIOTECH_API_URL")]
    api_url: Option<String>,

    /// Run the model in-process from this directory
    #[arg(long, env = "FISIOTECH_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Per-prediction timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// Pause after each prediction in milliseconds
    #[arg(long, default_value_t = 300)]
    pause_ms: u64,

    /// Diagnosis interval in milliseconds
    #[arg(long, default_value_t = 500)]
    refresh_ms: u64,

    /// Print each diagnosis to stdout as a JSON line
    #[arg(long)]
    json: bool,
}

fn inference_client(args: &Args) -> anyhow::Result<Arc<dyn InferenceClient>> {
    let timeout = Duration::from_millis(args.timeout_ms);

    if let Some(url) = &args.api_url {
        let client = HttpInferenceClient::new(HttpConfig::new(url).timeout(timeout))
            .with_context(|| format!("configuring API client for {}", url))?;
        info!("Using inference API at {}", url);
        return Ok(Arc::new(client));
    }

    let dir = args
        .model_dir
        .as_ref()
        .context("either --api-url or --model-dir is required")?;
    let model = HybridModel::load(&ModelArtifacts::new(dir))
        .with_context(|| format!("loading model from {}", dir.display()))?;
    let client = LocalInferenceClient::spawn(model)
        .context("starting model worker")?
        .with_timeout(timeout);
    Ok(Arc::new(client))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let client = inference_client(&args)?;
    let observer = Arc::new(MonitorObserver::new(args.json));
    let config = SessionConfig::default()
        .with_prediction_pause(Duration::from_millis(args.pause_ms))
        .with_refresh_interval(Duration::from_millis(args.refresh_ms));

    let mut session = Session::new(DeviceLinkOpener::new(LinkConfig::default()), client)
        .with_config(config)
        .with_observer(observer.clone());

    let target = LinkTarget::new(args.port.as_str()).with_baud(args.baud);
    session
        .connect(target.clone())
        .with_context(|| format!("connecting to {}", target))?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                if session.state() == ConnectionState::Disconnected {
                    break;
                }
            }
        }
    }

    let closing = observer.closing_diagnosis(&session);
    session.disconnect();
    match closing {
        Some(d) => info!("{} predictions, final diagnosis: [{}] {}", observer.predictions(), d.severity, d.title),
        None => info!("{} predictions, no diagnosis yet", observer.predictions()),
    }

    if observer.link_closed() {
        anyhow::bail!("link {} closed by the device", target);
    }
    Ok(())
}
