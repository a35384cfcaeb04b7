//! Barista service entry point.

use std::process::ExitCode;

use domain::Station;
use services::{Config, station};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env("barista", station::default_port(Station::Barista));
    services::launch(config, |config, metrics| {
        station::run(Station::Barista, config, metrics)
    })
    .await
}
