use std::path::PathBuf;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use domainsync::config::Config;
use domainsync::handler::{Handler, Invocation};
use domainsync::request::CustomResourceEvent;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    init_tracing();

    let event_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg_path = std::env::args().nth(2).map(PathBuf::from);
    let cfg = Config::load(cfg_path)?;
    info!(
        "starting domainsync region={} retry_budget={} backoff_unit_ms={}",
        cfg.region, cfg.remap_retry_budget, cfg.backoff_unit_ms
    );

    let raw = read_event(event_path).await?;
    let event: CustomResourceEvent = serde_json::from_str(&raw).context("parse event")?;

    let handler = Handler::new(cfg)?;
    let output = match handler.handle(&event).await {
        Invocation::Reported {
            envelope,
            delivered,
        } => serde_json::json!({ "callback": envelope, "delivered": delivered }),
        Invocation::Direct(verdict) => serde_json::json!({ "verdict": verdict }),
    };
    println!("{output}");
    Ok(())
}

async fn read_event(path: Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("read event {}", path.display())),
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("read event from stdin")?;
            Ok(raw)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
