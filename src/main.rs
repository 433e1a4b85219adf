mod config;
mod db;
mod error;
mod models;
mod run;
mod store;
mod util;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = config::Config::from_env()?;
    init_tracing(&config.log_filter);

    let store = store::ExpenseStore::new(&config.db_path);
    store.subscribe(|snapshot| {
        tracing::debug!(expenses = snapshot.len(), "expense snapshot updated");
    });
    store
        .initialize()
        .with_context(|| format!("Failed to load expenses from {}", config.db_path.display()))?;

    run::as_cli(&args, &store)
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
