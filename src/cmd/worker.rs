//! Single-job worker command — `reposcope worker review|debt`.

use anyhow::{Context, Result};
use tracing::Instrument;

use reposcope::app::App;
use reposcope::config::Config;
use reposcope::observability::run_span;
use reposcope::pipeline::{Job, Worker};

use crate::WorkerCommands;

pub async fn cmd_worker(config: Config, command: WorkerCommands) -> Result<()> {
    let bucket = config.store.bucket.clone();
    let app = App::from_config(config)?;

    let (worker, job): (Box<dyn Worker>, Job) = match command {
        WorkerCommands::Review { run_id, repo_path } => (
            Box::new(app.review_worker()),
            Job {
                run_id,
                repo_path,
                bucket,
            },
        ),
        WorkerCommands::Debt { run_id } => (
            Box::new(app.debt_worker()),
            Job {
                run_id,
                repo_path: String::new(),
                bucket,
            },
        ),
    };

    worker
        .run(&job)
        .instrument(run_span(worker.name(), &job.run_id))
        .await
        .with_context(|| format!("{} job for run {} failed", worker.name(), job.run_id))?;

    println!("Published {} report for run {}", worker.name(), job.run_id);
    Ok(())
}
