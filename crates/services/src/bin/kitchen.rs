//! Kitchen service entry point.

use std::process::ExitCode;

use domain::Station;
use services::{Config, station};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env("kitchen", station::default_port(Station::Kitchen));
    services::launch(config, |config, metrics| {
        station::run(Station::Kitchen, config, metrics)
    })
    .await
}
