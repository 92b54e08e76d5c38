use anyhow::Result;
use clap::Parser;

use sanddollar::cli::{self, Cli};
use sanddollar::logging::init_logging;
use sanddollar::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging()?;
    tracing::info!("Logging to {}", log_path.display());

    let settings = Settings::new()?;
    settings.validate()?;
    tracing::debug!("Loaded settings: {:?}", settings);

    cli::run(cli, settings).await
}
