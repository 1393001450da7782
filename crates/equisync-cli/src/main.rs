mod cli;
mod config;
mod error;
mod sync;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use equisync_core::{AlphaVantageClient, ReqwestHttpClient, Symbol};
use equisync_store::{Store, StoreConfig};

use crate::cli::Cli;
use crate::config::Config;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(()) => {
            log::info!("operation completed successfully");
            ExitCode::SUCCESS
        }
        Err(error) => {
            log::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), CliError> {
    let config = Config::from_env()?;
    let cli = Cli::parse();

    let symbol = Symbol::parse(&cli.symbol)?;
    let window = cli.window()?;

    let store = Store::open(StoreConfig::new(&config.db_path))?;
    let client = AlphaVantageClient::new(Arc::new(ReqwestHttpClient::new()), config.api_key);

    sync::run(&client, &store, &symbol, &window, cli.update_info).await?;
    Ok(())
}
