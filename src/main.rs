//! PopMQ server
//!
//! Loads settings, binds the listener and serves clients until Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;

use popmq::broker::Broker;
use popmq::config::{Settings, load_config};
use popmq::transport::start_tcp_server;
use popmq::utils::{BrokerError, logging};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.log.level);

    match run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(config: Settings) -> Result<(), BrokerError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| BrokerError::Bind { addr, source })?;
    let broker = Arc::new(Broker::with_settings(config.broker));

    tokio::select! {
        _ = start_tcp_server(listener, broker) => {
            error!("TCP server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}
