//! Counter service entry point.

use std::process::ExitCode;

use services::{Config, counter};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env(counter::SERVICE_NAME, counter::DEFAULT_PORT);
    services::launch(config, counter::run).await
}
