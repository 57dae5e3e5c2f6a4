//! HTTP server command — `reposcope serve`.

use anyhow::Result;
use std::sync::Arc;

use reposcope::app::App;
use reposcope::config::Config;
use reposcope::http::{AppState, ServerConfig, start_server};

pub async fn cmd_serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let server = ServerConfig {
        host: host.unwrap_or_else(|| config.server.host.clone()),
        port: port.unwrap_or(config.server.port),
    };

    let app = App::from_config(config)?;
    let (dispatcher, pool) = app.start_pool();
    let state = Arc::new(AppState {
        coordinator: app.coordinator(Arc::new(dispatcher)),
        reader: app.reader(),
        store: app.store.clone(),
    });

    // The router owns the only dispatcher; once it is dropped the pool drains
    start_server(server, state).await?;
    let jobs = pool.join().await;
    tracing::info!(jobs, "worker pool drained");
    Ok(())
}
