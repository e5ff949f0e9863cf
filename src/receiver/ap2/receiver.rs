//! High-Level `AirPlay` 2 Receiver API

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

use super::advertisement::Ap2ServiceAdvertiser;
use super::config::Ap2Config;
use super::rtsp_saver::RtspSaver;
use super::session::{self, SharedPipeline};
use crate::dmx::DmxLinkConfig;
use crate::protocol::crypto::Ed25519KeyPair;

/// Nominal samples per RTP audio packet (one AAC-LC frame), used to size
/// `Racked`'s reel windows. Matches the constant assumed by the audio
/// intake task in [`super::session`].
const SAMPLES_PER_PACKET: u32 = 1024;

/// mDNS service type the DMX light-show controller advertises itself under.
const DMX_CONTROLLER_SERVICE_TYPE: &str = "_dmxlink._tcp.local.";

/// Receiver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Receiver is stopped
    Stopped,
    /// Receiver is starting
    Starting,
    /// Receiver is running
    Running,
    /// Receiver is stopping
    Stopping,
}

/// Events emitted by the receiver
#[derive(Debug, Clone)]
pub enum ReceiverEvent {
    /// Receiver started
    Started,
    /// Client connected
    Connected {
        /// Peer address
        peer: String,
    },
    /// Pairing in progress
    PairingStarted,
    /// Pairing completed
    PairingComplete,
    /// Streaming started
    StreamingStarted,
    /// Audio data available
    AudioData {
        /// PCM samples
        samples: Vec<i16>,
        /// Sample rate
        sample_rate: u32,
    },
    /// Volume changed
    VolumeChanged {
        /// Volume in dB
        volume_db: f32,
    },
    /// Metadata updated
    MetadataUpdated {
        /// Track title
        title: Option<String>,
        /// Track artist
        artist: Option<String>,
    },
    /// Artwork available
    ArtworkUpdated {
        /// Artwork image data
        data: Vec<u8>,
        /// MIME type
        mime_type: String,
    },
    /// Client disconnected
    Disconnected,
    /// Receiver stopped
    Stopped,
    /// Error occurred
    Error {
        /// Error message
        message: String,
    },
}

/// Errors from the `AirPlay2Receiver`
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// Receiver is already running
    #[error("Receiver already running")]
    AlreadyRunning,

    /// Error during mDNS advertisement
    #[error("Advertisement error: {0}")]
    Advertisement(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session error
    #[error("Session error: {0}")]
    Session(String),
}

/// `AirPlay` 2 Receiver
///
/// High-level API for receiving `AirPlay` 2 audio streams.
///
/// # Example
///
/// ```rust,no_run
/// use airplay2::receiver::ap2::config::Ap2Config;
/// use airplay2::receiver::ap2::receiver::{AirPlay2Receiver, ReceiverEvent};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Ap2Config::new("My Speaker").with_password("secret123");
///
///     let mut receiver = AirPlay2Receiver::new(config)?;
///
///     // Subscribe to events
///     let mut events = receiver.subscribe();
///
///     // Start receiver
///     receiver.start().await?;
///
///     // Handle events
///     while let Ok(event) = events.recv().await {
///         match event {
///             ReceiverEvent::Connected { peer } => println!("Connected: {}", peer),
///             ReceiverEvent::AudioData {
///                 samples,
///                 sample_rate,
///             } => { /* play audio */ }
///             ReceiverEvent::Disconnected => break,
///             _ => {}
///         }
///     }
///
///     receiver.stop().await?;
///     Ok(())
/// }
/// ```
pub struct AirPlay2Receiver {
    config: Ap2Config,
    #[allow(dead_code)]
    identity: Ed25519KeyPair,
    state: Arc<RwLock<ReceiverState>>,
    event_tx: broadcast::Sender<ReceiverEvent>,
    shutdown_tx: Option<broadcast::Sender<()>>,
    accept_task: Option<JoinHandle<()>>,
    render_task: Option<JoinHandle<()>>,
    advertiser: Option<Ap2ServiceAdvertiser>,
    dmx_service_type: String,
    dmx_link_config: DmxLinkConfig,
    rtsp_saver_path: Option<std::path::PathBuf>,
}

impl AirPlay2Receiver {
    /// Create a new receiver with the given configuration
    ///
    /// # Errors
    /// Returns a `ReceiverError` if the initialization fails.
    pub fn new(config: Ap2Config) -> Result<Self, ReceiverError> {
        let identity = Ed25519KeyPair::generate();
        let (event_tx, _) = broadcast::channel(100);

        Ok(Self {
            config,
            identity,
            state: Arc::new(RwLock::new(ReceiverState::Stopped)),
            event_tx,
            shutdown_tx: None,
            accept_task: None,
            render_task: None,
            advertiser: None,
            dmx_service_type: DMX_CONTROLLER_SERVICE_TYPE.to_string(),
            dmx_link_config: DmxLinkConfig::default(),
            rtsp_saver_path: None,
        })
    }

    /// Subscribe to receiver events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReceiverEvent> {
        self.event_tx.subscribe()
    }

    /// Override the mDNS service type the render loop resolves the DMX
    /// controller under (`dmx.controller` in the file/CLI config).
    #[must_use]
    pub fn with_dmx_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.dmx_service_type = service_type.into();
        self
    }

    /// Override the DMX link's idle/stalled/retry timeouts (`dmx.timeouts.*`
    /// in the file/CLI config).
    #[must_use]
    pub fn with_dmx_link_config(mut self, config: DmxLinkConfig) -> Self {
        self.dmx_link_config = config;
        self
    }

    /// Enable capturing raw RTSP exchanges to `path` (`info.rtsp.saver.*` in
    /// the file/CLI config). `None` (the default) disables capture.
    #[must_use]
    pub fn with_rtsp_saver_path(mut self, path: Option<std::path::PathBuf>) -> Self {
        self.rtsp_saver_path = path;
        self
    }

    /// Start the receiver
    ///
    /// # Errors
    /// Returns a `ReceiverError` if the receiver is already running or
    /// if there is an error during starting components.
    pub async fn start(&mut self) -> Result<(), ReceiverError> {
        let mut state = self.state.write().await;
        if *state != ReceiverState::Stopped {
            return Err(ReceiverError::AlreadyRunning);
        }
        *state = ReceiverState::Starting;
        drop(state);

        // Create shutdown channel
        let (shutdown_tx, _) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx.clone());

        // Wire the RTSP handler table, the pairing identity, and the
        // process-wide audio pipeline that every accepted connection and
        // the render loop share.
        let identity = self.identity.clone();
        let (handlers, public_key, setup_handler) = session::build_handlers(&self.config, identity);
        let handlers = Arc::new(handlers);

        let pipeline = Arc::new(SharedPipeline::new(
            &self.config.name,
            &self.config.device_id,
            SAMPLES_PER_PACKET,
        ));

        let rtsp_saver = match &self.rtsp_saver_path {
            Some(path) => match RtspSaver::open(path) {
                Ok(saver) => Some(Arc::new(saver)),
                Err(e) => {
                    tracing::warn!("failed to open RTSP capture file: {e}, capture disabled");
                    None
                }
            },
            None => None,
        };

        // Start mDNS advertisement, carrying the pairing public key
        // `/pair-verify` actually signs with.
        let advertiser = Ap2ServiceAdvertiser::new(self.config.clone(), public_key)
            .map_err(|e| ReceiverError::Advertisement(e.to_string()))?;
        advertiser
            .start()
            .await
            .map_err(|e| ReceiverError::Advertisement(e.to_string()))?;
        self.advertiser = Some(advertiser);

        // Start the render loop: resolves the DMX controller, paces frames
        // from Racked against the anchor/clock bridge, and streams
        // DmxFrame messages once connected.
        self.render_task = Some(session::spawn_render_task(
            pipeline.clone(),
            self.dmx_service_type.clone(),
            self.dmx_link_config,
        ));

        // Start TCP listener
        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.config.server_port))
            .await
            .map_err(ReceiverError::Io)?;

        tracing::info!(
            "AirPlay 2 receiver listening on port {}",
            self.config.server_port
        );

        // Update state
        *self.state.write().await = ReceiverState::Running;
        let _ = self.event_tx.send(ReceiverEvent::Started);

        // Start accept loop: at most one active session exists at a time,
        // so each newly accepted connection races against any session
        // already being driven.
        let mut shutdown_rx = shutdown_tx.subscribe();
        let event_tx_clone = self.event_tx.clone();

        self.accept_task = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        let Ok((stream, peer_addr)) = accepted else {
                            tracing::warn!("accept failed, continuing");
                            continue;
                        };
                        tracing::debug!("Accepted connection from {}", peer_addr);
                        let _ = event_tx_clone.send(ReceiverEvent::Connected {
                            peer: peer_addr.to_string(),
                        });

                        let handlers = handlers.clone();
                        let pipeline = pipeline.clone();
                        let setup_handler = setup_handler.clone();
                        let event_tx = event_tx_clone.clone();
                        let rtsp_saver = rtsp_saver.clone();
                        tokio::spawn(async move {
                            session::run_connection(stream, peer_addr, handlers, pipeline, setup_handler, rtsp_saver).await;
                            let _ = event_tx.send(ReceiverEvent::Disconnected);
                        });
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Accept loop shutting down");
                        break;
                    }
                    else => break,
                }
            }
        }));

        Ok(())
    }

    /// Stop the receiver
    ///
    /// # Errors
    /// Returns a `ReceiverError` if an error occurs while stopping.
    pub async fn stop(&mut self) -> Result<(), ReceiverError> {
        let mut state = self.state.write().await;
        if *state == ReceiverState::Stopped {
            return Ok(());
        }
        *state = ReceiverState::Stopping;
        drop(state);

        // Signal shutdown
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
        if let Some(task) = self.render_task.take() {
            task.abort();
        }
        if let Some(advertiser) = self.advertiser.take() {
            if let Err(e) = advertiser.stop().await {
                tracing::warn!("failed to stop mDNS advertisement cleanly: {e}");
            }
        }

        *self.state.write().await = ReceiverState::Stopped;
        let _ = self.event_tx.send(ReceiverEvent::Stopped);

        tracing::info!("AirPlay 2 receiver stopped");
        Ok(())
    }

    /// Get current state
    pub async fn state(&self) -> ReceiverState {
        *self.state.read().await
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &Ap2Config {
        &self.config
    }
}

/// Builder for `AirPlay2Receiver`
pub struct ReceiverBuilder {
    config: Ap2Config,
}

impl ReceiverBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: Ap2Config::new(name),
        }
    }

    /// Set a password for the receiver
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the port to listen on
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.server_port = port;
        self
    }

    /// Set multi-room support
    #[must_use]
    pub fn multi_room(mut self, enabled: bool) -> Self {
        self.config.multi_room_enabled = enabled;
        self
    }

    /// Build the receiver
    ///
    /// # Errors
    /// Returns a `ReceiverError` if the receiver cannot be built.
    pub fn build(self) -> Result<AirPlay2Receiver, ReceiverError> {
        AirPlay2Receiver::new(self.config)
    }
}
