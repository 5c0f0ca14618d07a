use std::net::SocketAddr;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;

use crate::ai::gemini::GeminiClient;
use crate::util::telemetry;

mod ai;
mod api;
mod constants;
mod db;
mod eco;
#[cfg(test)]
mod testing;
mod util;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Ai(#[from] ai::AiError),

    #[error(transparent)]
    Std(#[from] Box<dyn std::error::Error>),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry_registry = telemetry::Telemetry::new().await?.register();

    tracing::info!("starting main application");

    let model = Arc::new(GeminiClient::new().await?);

    let (tx_server_ready, rx_server_ready) = tokio::sync::mpsc::unbounded_channel::<SocketAddr>();

    let handles = api::server::start_server(tx_server_ready, rx_server_ready, model)
        .await
        .unwrap();

    _ = join_all(handles).await;

    telemetry_registry.shutdown();
    Ok(())
}
