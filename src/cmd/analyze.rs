//! One-shot analysis command — `reposcope analyze <repo_url>`.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use reposcope::app::App;
use reposcope::config::Config;
use reposcope::pipeline::{PollPolicy, Scope};

pub async fn cmd_analyze(
    config: Config,
    repo_url: &str,
    timeout_secs: u64,
    interval_secs: u64,
) -> Result<()> {
    let app = App::from_config(config)?;
    let (dispatcher, pool) = app.start_pool();
    let coordinator = app.coordinator(Arc::new(dispatcher));

    let receipt = coordinator.start_run(repo_url).await?;
    println!(
        "Run {} started (bucket {}, region {})",
        receipt.run_id, receipt.bucket, receipt.region
    );

    let snapshot = app
        .reader()
        .poll(
            &Scope::Run(receipt.run_id.clone()),
            poll_policy(timeout_secs, interval_secs),
        )
        .await
        .with_context(|| format!("Reports for run {} are not ready", receipt.run_id))?;

    drop(coordinator);
    pool.join().await;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Fixed-interval schedule covering `timeout_secs`, at least one read.
fn poll_policy(timeout_secs: u64, interval_secs: u64) -> PollPolicy {
    let interval = interval_secs.max(1);
    let attempts = timeout_secs.div_ceil(interval).max(1);
    PollPolicy {
        interval: Duration::from_secs(interval),
        max_attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
    }
}
