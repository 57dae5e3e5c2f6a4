//! Status command — `reposcope status [--run-id ID]`.

use anyhow::Result;

use reposcope::app::App;
use reposcope::config::Config;
use reposcope::pipeline::Scope;

pub async fn cmd_status(config: Config, run_id: Option<String>) -> Result<()> {
    let scope = match run_id {
        Some(run_id) => Scope::Run(run_id),
        None => Scope::Latest,
    };
    let snapshot = App::from_config(config)?.reader().snapshot(&scope).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
