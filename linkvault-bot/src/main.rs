//! LinkVault Bot - Main entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use linkvault_bot::{telegram, Dispatcher, SqliteLinkStore, TelegramTransport};
use linkvault_common::config::Config;
use linkvault_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("LinkVault Bot v{}", env!("CARGO_PKG_VERSION"));

    // Open the link store
    if let Some(parent) = config.storage.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let store = SqliteLinkStore::new(&config.storage.db_path)
        .with_context(|| format!("Failed to open {}", config.storage.db_path.display()))?;

    let transport = Arc::new(TelegramTransport::new(config.telegram.bot_token.clone()));
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(store), transport.clone()));

    // Poll Telegram until the process is stopped
    telegram::run(transport, dispatcher).await?;
    Ok(())
}
