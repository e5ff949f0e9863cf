//! Resolves the DMX controller by zeroconf name and runs the dual-socket
//! control/data pattern: a TCP control socket carrying a JSON handshake and
//! periodic feedback, and a TCP data socket streaming length-prefixed
//! MessagePack [`DmxFrame`]s.

use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::message::{DmxFrame, Feedback, Handshake};
use crate::stats::{SharedStats, default_stats};

/// How long `resolve` waits for an mDNS answer before retrying.
const RESOLVE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Errors from resolving or operating the DMX controller link.
#[derive(Debug, thiserror::Error)]
pub enum DmxLinkError {
    /// mDNS browse/resolve failed.
    #[error("mDNS error: {0}")]
    Mdns(#[from] mdns_sd::Error),
    /// No controller answered before the resolve timeout.
    #[error("DMX controller {0} not found")]
    NotFound(String),
    /// Socket I/O failure.
    #[error("DMX link I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A length-prefixed frame exceeded the sanity cap.
    #[error("oversized DMX link frame: {0} bytes")]
    OversizedFrame(u32),
}

/// A resolved controller's address.
#[derive(Debug, Clone)]
pub struct ResolvedController {
    /// Host address (IPv4 or IPv6) the controller advertised.
    pub addr: std::net::IpAddr,
    /// Control-socket port the controller advertised.
    pub control_port: u16,
}

/// Resolve a DMX controller advertised under `service_type` (e.g.
/// `_dmxctrl._tcp.local.`) by mDNS.
pub async fn browse(service_type: &str) -> Result<ResolvedController, DmxLinkError> {
    let daemon = ServiceDaemon::new()?;
    let receiver = daemon.browse(service_type)?;

    let result = timeout(RESOLVE_TIMEOUT, async {
        while let Ok(event) = receiver.recv_async().await {
            if let ServiceEvent::ServiceResolved(info) = event {
                if let Some(addr) = info.get_addresses().iter().next() {
                    return Some(ResolvedController {
                        addr: *addr,
                        control_port: info.get_port(),
                    });
                }
            }
        }
        None
    })
    .await;

    let _ = daemon.stop_browse(service_type);

    match result {
        Ok(Some(resolved)) => Ok(resolved),
        _ => Err(DmxLinkError::NotFound(service_type.to_string())),
    }
}

/// Configuration for [`DmxLink`]'s timeouts, per `dmx.timeouts.milliseconds.*`.
#[derive(Debug, Clone, Copy)]
pub struct DmxLinkConfig {
    /// Idle period after which the controller is considered gone.
    pub idle_ms: u64,
    /// Period of silence on either socket before the stall watchdog resets
    /// both and attempts to reconnect.
    pub stalled_ms: u64,
    /// Backoff between resolver retries after a failed connect.
    pub retry_ms: u64,
    /// Lead time advertised in the handshake, microseconds.
    pub lead_time_us: u64,
}

impl Default for DmxLinkConfig {
    fn default() -> Self {
        Self {
            idle_ms: 10_000,
            stalled_ms: 2_000,
            retry_ms: 500,
            lead_time_us: 100_000,
        }
    }
}

/// Maximum accepted length-prefixed frame size, guarding against a
/// corrupted length prefix turning into an unbounded allocation.
const MAX_FRAME_LEN: u32 = 1 << 20;

/// The live connection to a resolved DMX controller.
///
/// Owns the outbound control socket and the inbound data-socket listener.
/// `send_frame` is a best-effort send: if the data socket isn't currently
/// connected the frame is silently dropped, matching the spec's
/// disconnected-send semantics.
pub struct DmxLink {
    control: Option<TcpStream>,
    data_listener: TcpListener,
    data_port: u16,
    data: Option<TcpStream>,
    config: DmxLinkConfig,
    feedback_tx: mpsc::UnboundedSender<Feedback>,
    stats: SharedStats,
}

impl DmxLink {
    /// Bind the data-socket listener on an ephemeral port and connect the
    /// control socket to `controller`, sending the handshake.
    ///
    /// Returns the link plus a receiver for feedback messages logged from
    /// the control socket's read loop.
    pub async fn connect(
        controller: &ResolvedController,
        config: DmxLinkConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Feedback>), DmxLinkError> {
        let data_listener = TcpListener::bind(("0.0.0.0", 0)).await?;
        let data_port = data_listener.local_addr()?.port();

        let mut control =
            TcpStream::connect((controller.addr, controller.control_port)).await?;
        let handshake = Handshake::new(
            config.idle_ms,
            config.lead_time_us,
            now_micros(),
            data_port,
        );
        let body = serde_json::to_vec(&handshake).map_err(|e| {
            DmxLinkError::Io(std::io::Error::other(e.to_string()))
        })?;
        write_framed_json(&mut control, &body).await?;

        let (feedback_tx, feedback_rx) = mpsc::unbounded_channel();

        Ok((
            Self {
                control: Some(control),
                data_listener,
                data_port,
                data: None,
                config,
                feedback_tx,
                stats: default_stats(),
            },
            feedback_rx,
        ))
    }

    /// Replace the default [`crate::stats::TracingStatsSink`] with a custom
    /// [`SharedStats`] handle (e.g. one backed by `stats.db_uri`).
    #[must_use]
    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.stats = stats;
        self
    }

    /// Accept the controller's inbound connection to the data socket. Must
    /// be called (and re-called after a watchdog reset) before
    /// `send_frame` will actually transmit anything.
    pub async fn accept_data_connection(&mut self) -> Result<(), DmxLinkError> {
        let (stream, peer) = self.data_listener.accept().await?;
        info!(%peer, "DMX controller connected on data socket");
        self.data = Some(stream);
        Ok(())
    }

    /// Run the control socket's read loop, forwarding feedback messages
    /// until the socket closes or errors. Intended to run as its own task
    /// alongside the render loop's `send_frame` calls.
    pub async fn run_control_read_loop(&mut self) -> Result<(), DmxLinkError> {
        let Some(control) = self.control.as_mut() else {
            return Ok(());
        };
        loop {
            match read_framed_json::<Feedback>(control).await {
                Ok(Some(feedback)) => {
                    debug!(fps = feedback.fps, "DMX controller feedback");
                    self.stats.record_gauge("dmx.fps", f64::from(feedback.fps));
                    self.stats
                        .record_counter("dmx.dmx_qok", feedback.dmx_qok);
                    self.stats
                        .record_counter("dmx.dmx_qrf", feedback.dmx_qrf);
                    self.stats
                        .record_counter("dmx.dmx_qsf", feedback.dmx_qsf);
                    let _ = self.feedback_tx.send(feedback);
                }
                Ok(None) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a DMX frame over the data socket. If the socket isn't currently
    /// connected the frame is silently dropped (spec §4.7: "a send while
    /// disconnected is silently dropped").
    pub async fn send_frame(&mut self, frame: &DmxFrame) {
        let Some(data) = self.data.as_mut() else {
            return;
        };
        let Ok(bytes) = rmp_serde::to_vec_named(frame) else {
            return;
        };
        if bytes.len() as u64 > u64::from(MAX_FRAME_LEN) {
            warn!(len = bytes.len(), "dropping oversized DMX frame");
            return;
        }
        let len = (bytes.len() as u32).to_be_bytes();
        if data.write_all(&len).await.is_err() || data.write_all(&bytes).await.is_err() {
            warn!("DMX data socket write failed, dropping connection");
            self.data = None;
        }
    }

    /// Tear down both sockets so a fresh `connect`/`accept_data_connection`
    /// pair can reconnect. Called by the stall watchdog.
    pub fn reset(&mut self) {
        self.control = None;
        self.data = None;
    }

    /// The ephemeral port the data socket is listening on, to report in the
    /// handshake (and to re-advertise if the link is rebuilt).
    #[must_use]
    pub fn data_port(&self) -> u16 {
        self.data_port
    }

    /// The configured stall timeout, for the caller's watchdog timer.
    #[must_use]
    pub fn stalled_timeout(&self) -> Duration {
        Duration::from_millis(self.config.stalled_ms)
    }

    /// The configured resolver retry backoff.
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.config.retry_ms)
    }
}

async fn write_framed_json(stream: &mut TcpStream, body: &[u8]) -> Result<(), DmxLinkError> {
    let len = (body.len() as u32).to_be_bytes();
    stream.write_all(&len).await?;
    stream.write_all(body).await?;
    Ok(())
}

async fn read_framed_json<T: serde::de::DeserializeOwned>(
    stream: &mut TcpStream,
) -> Result<Option<T>, DmxLinkError> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(DmxLinkError::OversizedFrame(len));
    }
    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf).await?;
    let value = serde_json::from_slice(&buf)
        .map_err(|e| DmxLinkError::Io(std::io::Error::other(e.to_string())))?;
    Ok(Some(value))
}

fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn handshake_round_trips_over_loopback() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_framed_json::<Handshake>(&mut stream).await.unwrap()
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let hs = Handshake::new(1000, 2000, 3000, 6454);
        let body = serde_json::to_vec(&hs).unwrap();
        write_framed_json(&mut client, &body).await.unwrap();

        let received = server.await.unwrap();
        assert!(received.is_some());
        assert_eq!(received.unwrap().data_port, 6454);
    }

    #[tokio::test]
    async fn send_frame_without_data_connection_is_a_noop() {
        let config = DmxLinkConfig::default();
        let listener = TcpListener::bind(("0.0.0.0", 0)).await.unwrap();
        let mut link = DmxLink {
            control: None,
            data_listener: listener,
            data_port: 0,
            data: None,
            config,
            feedback_tx: mpsc::unbounded_channel().0,
            stats: default_stats(),
        };
        link.send_frame(&DmxFrame::new(1, 0, true, [0u8; 16])).await;
    }
}
