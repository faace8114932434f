//! Log viewer comments driver
//!
//! Paints a log file, replays a script of selections and dialog answers
//! against a comment store, and prints the comments, the events and the
//! highlighted rows as JSON.

use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logview_comments::script::{parse_script, replay};
use logview_comments::{Config, RenderTree};

fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    let loaded = Config::from_env();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.filter)
                .unwrap_or_else(|_| "logview_comments=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = &loaded {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
    }

    let mut args = std::env::args().skip(1);
    let log_file = args
        .next()
        .map(PathBuf::from)
        .or_else(|| config.driver.log_file.clone())
        .context("no log file given (argument 1 or LOGVIEW_LOG_FILE)")?;
    let script_file = args.next().map(PathBuf::from).or_else(|| config.driver.script.clone());

    tracing::info!("Starting logview-comments v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(log_file = %log_file.display(), "Painting log");

    let log = std::fs::read_to_string(&log_file)
        .with_context(|| format!("failed to read log file {}", log_file.display()))?;
    let mut tree = RenderTree::from_log(&log);

    let steps = match &script_file {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read script {}", path.display()))?;
            parse_script(&json).with_context(|| format!("invalid script {}", path.display()))?
        }
        None => {
            tracing::warn!("No script given, rendering rows only");
            Vec::new()
        }
    };

    let report = replay(&mut tree, &steps, &config);
    tracing::info!(
        comments = report.comments.len(),
        failures = report.failures.len(),
        rows = tree.row_count(),
        "Replay finished"
    );

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to encode report")?
    );
    Ok(())
}
