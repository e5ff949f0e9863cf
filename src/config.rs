//! Configuration inputs: a TOML file overlaid by CLI flags, covering every
//! knob named in spec §6 (`rtsp.*`, `mdns.*`, `dmx.*`, `frame.*`, `info.*`,
//! `stats.*`).

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

/// RTSP control-channel settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RtspConfig {
    /// Worker threads serving RTSP connections.
    pub threads: usize,
    /// Audio buffer size advertised in SETUP replies, in bytes.
    pub audio_buffer_size_bytes: usize,
}

impl Default for RtspConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            audio_buffer_size_bytes: 8 * 1024 * 1024,
        }
    }
}

/// mDNS / zeroconf settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MdnsConfig {
    /// Port advertised for the RTSP service.
    pub port: u16,
    /// Service (friendly) name advertised in TXT records.
    pub service: String,
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            port: 7000,
            service: "AirPierre".to_string(),
        }
    }
}

/// DMX controller-link timeout settings, milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DmxTimeoutsConfig {
    /// Idle period after which the controller is considered gone.
    pub idle: u64,
    /// Silence period before the stall watchdog resets both sockets.
    pub stalled: u64,
    /// Backoff between resolver retries.
    pub retry: u64,
}

impl Default for DmxTimeoutsConfig {
    fn default() -> Self {
        Self {
            idle: 10_000,
            stalled: 2_000,
            retry: 500,
        }
    }
}

/// DMX controller-link settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DmxConfig {
    /// mDNS service type the controller advertises under.
    pub controller: String,
    /// Socket timeouts.
    pub timeouts: DmxTimeoutsMilliseconds,
}

impl Default for DmxConfig {
    fn default() -> Self {
        Self {
            controller: "_dmxctrl._tcp.local.".to_string(),
            timeouts: DmxTimeoutsMilliseconds::default(),
        }
    }
}

/// Wrapper matching the `dmx.timeouts.milliseconds.*` key path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DmxTimeoutsMilliseconds {
    /// The nested timeouts.
    pub milliseconds: DmxTimeoutsConfig,
}

/// Frame-pipeline settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Worker threads for Racked's decode/DSP stage.
    pub racked_threads: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { racked_threads: 2 }
    }
}

/// Inbound RTSP traffic capture, for protocol debugging.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InfoRtspSaverConfig {
    /// Whether to write captured RTSP exchanges to disk.
    pub enable: bool,
    /// Directory to write capture files to.
    pub path: PathBuf,
    /// Capture file name.
    pub file: String,
}

impl Default for InfoRtspSaverConfig {
    fn default() -> Self {
        Self {
            enable: false,
            path: PathBuf::from("."),
            file: "rtsp_trace.log".to_string(),
        }
    }
}

/// `info.rtsp.saver.*` nesting.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InfoRtspConfig {
    /// The saver sub-section.
    pub saver: InfoRtspSaverConfig,
}

/// `info.*` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    /// `info.rtsp.*` settings.
    pub rtsp: InfoRtspConfig,
}

/// Observability/stats settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Connection URI for the stats sink (opaque to the core; consumed by
    /// whatever metrics backend the deployment wires in).
    pub db_uri: Option<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { db_uri: None }
    }
}

/// The full, file-backed configuration tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `rtsp.*`
    pub rtsp: RtspConfig,
    /// `mdns.*`
    pub mdns: MdnsConfig,
    /// `dmx.*`
    pub dmx: DmxConfig,
    /// `frame.*`
    pub frame: FrameConfig,
    /// `info.*`
    pub info: InfoConfig,
    /// `stats.*`
    pub stats: StatsConfig,
}

/// Errors loading or merging configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's TOML was malformed.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults for
    /// anything the file omits.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply CLI overrides on top of the file (or default) configuration.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(threads) = cli.rtsp_threads {
            self.rtsp.threads = threads;
        }
        if let Some(name) = &cli.name {
            self.mdns.service = name.clone();
        }
        if let Some(port) = cli.port {
            self.mdns.port = port;
        }
        if let Some(port) = cli.mdns_port {
            self.mdns.port = port;
        }
        if let Some(service) = &cli.mdns_service {
            self.mdns.service = service.clone();
        }
        if let Some(controller) = &cli.dmx_controller {
            self.dmx.controller = controller.clone();
        }
        if cli.debug {
            self.info.rtsp.saver.enable = true;
        }
    }
}

/// CLI overlay: flags mirror the config-file key paths they override, so
/// `--rtsp-threads N` always wins over the file's `rtsp.threads`.
#[derive(Debug, Parser)]
#[command(name = "airplay2-lightshow", about = "AirPlay 2 light-show receiver")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "airplay2.toml")]
    pub config: PathBuf,

    /// Override `rtsp.threads`.
    #[arg(long)]
    pub rtsp_threads: Option<usize>,

    /// Advertised device name. Overrides `mdns.service`.
    #[arg(long)]
    pub name: Option<String>,

    /// RTSP/HTTP listen port. Overrides `mdns.port`.
    #[arg(long)]
    pub port: Option<u16>,

    /// `tracing` filter directive (e.g. `info`, `airplay2=debug`). Falls
    /// back to `RUST_LOG` when unset.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override `mdns.port`.
    #[arg(long)]
    pub mdns_port: Option<u16>,

    /// Override `mdns.service`.
    #[arg(long)]
    pub mdns_service: Option<String>,

    /// Override `dmx.controller`.
    #[arg(long)]
    pub dmx_controller: Option<String>,

    /// Enable the RTSP trace saver regardless of the config file.
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.rtsp.threads, 4);
        assert_eq!(config.mdns.port, 7000);
        assert_eq!(config.dmx.timeouts.milliseconds.idle, 10_000);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let toml_text = r#"
            [rtsp]
            threads = 8

            [dmx]
            controller = "_mydmx._tcp.local."
        "#;
        let config: Config = toml::from_str(toml_text).unwrap();
        assert_eq!(config.rtsp.threads, 8);
        assert_eq!(config.rtsp.audio_buffer_size_bytes, 8 * 1024 * 1024);
        assert_eq!(config.dmx.controller, "_mydmx._tcp.local.");
        assert_eq!(config.dmx.timeouts.milliseconds.stalled, 2_000);
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let mut config = Config::default();
        let cli = Cli {
            config: PathBuf::from("airplay2.toml"),
            rtsp_threads: Some(16),
            name: None,
            port: None,
            log_level: None,
            mdns_port: None,
            mdns_service: None,
            dmx_controller: Some("_other._tcp.local.".to_string()),
            debug: true,
        };
        config.apply_cli(&cli);
        assert_eq!(config.rtsp.threads, 16);
        assert_eq!(config.mdns.port, 7000);
        assert_eq!(config.dmx.controller, "_other._tcp.local.");
        assert!(config.info.rtsp.saver.enable);
    }

    #[test]
    fn name_and_port_flags_override_mdns_fields() {
        let mut config = Config::default();
        let cli = Cli {
            config: PathBuf::from("airplay2.toml"),
            rtsp_threads: None,
            name: Some("Den Speaker".to_string()),
            port: Some(7001),
            log_level: Some("debug".to_string()),
            mdns_port: None,
            mdns_service: None,
            dmx_controller: None,
            debug: false,
        };
        config.apply_cli(&cli);
        assert_eq!(config.mdns.service, "Den Speaker");
        assert_eq!(config.mdns.port, 7001);
    }
}
