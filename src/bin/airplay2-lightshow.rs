//! Process entry point: loads configuration, initializes logging, and runs
//! the `AirPlay` 2 light-show receiver until interrupted.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use airplay2::config::{Cli, Config};
use airplay2::dmx::DmxLinkConfig;
use airplay2::{AirPlay2Receiver, Ap2Config};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = cli
        .log_level
        .clone()
        .map(EnvFilter::new)
        .unwrap_or_else(EnvFilter::from_default_env);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("no usable config file at {:?} ({e}), using defaults", cli.config);
            Config::default()
        }
    };
    config.apply_cli(&cli);

    let ap2_config = Ap2Config::new(config.mdns.service.clone()).with_port(config.mdns.port);
    let dmx_link_config = DmxLinkConfig {
        idle_ms: config.dmx.timeouts.milliseconds.idle,
        stalled_ms: config.dmx.timeouts.milliseconds.stalled,
        retry_ms: config.dmx.timeouts.milliseconds.retry,
        ..DmxLinkConfig::default()
    };
    let rtsp_saver_path = config
        .info
        .rtsp
        .saver
        .enable
        .then(|| config.info.rtsp.saver.path.join(&config.info.rtsp.saver.file));

    let mut receiver = match AirPlay2Receiver::new(ap2_config) {
        Ok(receiver) => receiver
            .with_dmx_service_type(config.dmx.controller.clone())
            .with_dmx_link_config(dmx_link_config)
            .with_rtsp_saver_path(rtsp_saver_path),
        Err(e) => {
            tracing::error!("failed to construct receiver: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = receiver.start().await {
        tracing::error!("failed to start receiver: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        name = %config.mdns.service,
        port = config.mdns.port,
        "airplay2-lightshow running, press Ctrl-C to stop"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
    }

    if let Err(e) = receiver.stop().await {
        tracing::error!("error while stopping receiver: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
