//! Composition root: wires the RTSP control-channel handlers to the pairing,
//! setup, and timing subsystems, and drives the per-connection read/dispatch
//! loop that feeds decoded audio into the shared render pipeline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::dmx::{self, DmxLink, DmxLinkConfig};
use crate::frame::decoder::FrameDecoder;
use crate::frame::{FlushInfo, FlushKind, Racked, RackedConfig};
use crate::protocol::crypto::Ed25519KeyPair;
use crate::render::{RenderConfig, RenderLoop};
use crate::sync::{AnchorData, AnchorStore, ClockBridge};

use super::capabilities::DeviceCapabilities;
use super::command_handler;
use super::config::Ap2Config;
use super::control_handlers;
use super::encrypted_rtsp::{ConnectionState, EncryptedConnection};
use super::info_endpoint::{InfoEndpoint, create_info_handler};
use super::pairing_handlers::{PairingHandler, create_pairing_handlers};
use super::pairing_server::PairingServer;
use super::request_handler::{
    Ap2Event, Ap2Handlers, Ap2RequestContext, HandlerFn, handle_ap2_request,
};
use super::rtsp_saver::RtspSaver;
use super::session_context::SessionContext;
use super::session_state::Ap2SessionState;
use super::setup_handler::SetupHandler;
use super::timing_handler;

/// Connection-level idle-timeout budget: a `SessionContext` with no inbound
/// traffic for this long is torn down even without a TEARDOWN or transport
/// close (spec.md §3 Data Model, `SessionContext` lifecycle).
const CONNECTION_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Nominal AirPlay 2 audio sample rate. Every stream this receiver has seen
/// negotiates 44.1 kHz; `AudioStreamFormat.sample_rate` is trusted over this
/// once a SETUP phase 2 response carries one.
const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Samples per channel in one AAC-LC frame, and so the size the FFT in
/// [`FrameDecoder`] is planned for.
const SAMPLES_PER_AAC_FRAME: usize = 1024;

/// Port range handed to [`SetupHandler`] for event/timing/audio channel
/// allocation. Kept clear of the RTSP control port (`Ap2Config::server_port`,
/// default 7000).
const SETUP_PORT_RANGE_START: u16 = 7001;
const SETUP_PORT_RANGE_END: u16 = 7999;

/// Transient-pairing PIN used when a receiver is configured without one.
/// `HomeKit` transient pairing still requires an SRP verifier; senders that
/// don't prompt for a PIN ignore it.
const DEFAULT_TRANSIENT_PIN: &str = "3939";

/// The process-wide pipeline state shared by every connection's audio intake
/// task and the single render loop. `Ap2Config::max_sessions` is 1, so one
/// instance covers the receiver's whole lifetime.
pub struct SharedPipeline {
    /// Frame buffer between RTP intake and the render loop.
    pub racked: Arc<Racked>,
    /// RTP-timestamp-to-local-time mapping.
    pub anchor: Arc<AnchorStore>,
    /// Shared-memory bridge to the PTP helper process.
    pub clock_bridge: Arc<Mutex<ClockBridge>>,
}

impl SharedPipeline {
    /// Build the pipeline for a receiver named `receiver_name` with device
    /// identity `device_id`, used to derive the clock bridge's shared-memory
    /// segment name.
    #[must_use]
    pub fn new(receiver_name: &str, device_id: &str, samples_per_packet: u32) -> Self {
        let shm_name = ClockBridge::segment_name(receiver_name, device_id);
        let mut clock_bridge = ClockBridge::unmapped(shm_name);
        if let Err(e) = clock_bridge.try_reopen() {
            tracing::warn!("clock bridge helper not available yet: {e}");
        }

        Self {
            racked: Arc::new(Racked::new(RackedConfig::default(), samples_per_packet)),
            anchor: Arc::new(AnchorStore::new(DEFAULT_SAMPLE_RATE)),
            clock_bridge: Arc::new(Mutex::new(clock_bridge)),
        }
    }
}

/// Build the request handler table and the setup handler backing `SETUP`.
///
/// `identity` is consumed by the pairing server; its public key is extracted
/// first and returned so the caller can advertise the same key over mDNS
/// that `/pair-verify` actually signs with.
#[must_use]
pub fn build_handlers(
    config: &Ap2Config,
    identity: Ed25519KeyPair,
) -> (Ap2Handlers, [u8; 32], Arc<SetupHandler>) {
    let public_key = *identity.public_key().as_bytes();

    let capabilities = Arc::new(DeviceCapabilities::audio_receiver(
        &config.device_id,
        &config.name,
        public_key,
    ));
    let info_endpoint = Arc::new(InfoEndpoint::new(capabilities));

    let mut pairing_server = PairingServer::new(identity);
    pairing_server.set_password(config.password.as_deref().unwrap_or(DEFAULT_TRANSIENT_PIN));
    let pairing_handler = Arc::new(PairingHandler::new(pairing_server));
    let (pair_setup, pair_verify) = create_pairing_handlers(pairing_handler);

    let audio_latency_samples = config.buffer_size_ms.saturating_mul(DEFAULT_SAMPLE_RATE) / 1000;
    let setup_handler = Arc::new(SetupHandler::new(
        SETUP_PORT_RANGE_START,
        SETUP_PORT_RANGE_END,
        audio_latency_samples,
    ));
    let setup_for_handler = setup_handler.clone();
    let setup: HandlerFn =
        Box::new(move |req, cseq, ctx| setup_for_handler.handle(req, cseq, ctx));

    let handlers = Ap2Handlers {
        info: Box::new(create_info_handler(info_endpoint)),
        pair_setup,
        pair_verify,
        auth_setup: Box::new(control_handlers::handle_auth_setup),
        setup,
        record: Box::new(control_handlers::handle_record),
        pause: Box::new(control_handlers::handle_record),
        flush: Box::new(control_handlers::handle_flush),
        teardown: Box::new(control_handlers::handle_teardown),
        get_parameter: Box::new(control_handlers::handle_get_parameter),
        set_parameter: Box::new(control_handlers::handle_set_parameter),
        command: Box::new(command_handler::handle_command),
        feedback: Box::new(command_handler::handle_feedback),
        audio_mode: Box::new(control_handlers::handle_record),
        flush_buffered: Box::new(timing_handler::handle_flush_buffered),
        set_peers: Box::new(timing_handler::handle_set_peers),
        set_rate_anchor_time: Box::new(timing_handler::handle_set_rate_anchor_time),
    };

    (handlers, public_key, setup_handler)
}

/// Spawn the process-wide render loop against a discovered DMX controller.
/// Retries controller discovery and connection on failure; once connected,
/// `RenderLoop::run` owns the link for the rest of the process's life.
pub fn spawn_render_task(
    pipeline: Arc<SharedPipeline>,
    dmx_service_type: String,
    dmx_link_config: DmxLinkConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let controller = match dmx::browse(&dmx_service_type).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("DMX controller discovery failed: {e}, retrying");
                    tokio::time::sleep(Duration::from_millis(dmx_link_config.retry_ms)).await;
                    continue;
                }
            };

            let (mut link, _feedback_rx) =
                match DmxLink::connect(&controller, dmx_link_config).await {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!("DMX controller connect failed: {e}, retrying");
                        tokio::time::sleep(Duration::from_millis(dmx_link_config.retry_ms)).await;
                        continue;
                    }
                };

            let mut render_loop = RenderLoop::new(
                pipeline.racked.clone(),
                pipeline.anchor.clone(),
                pipeline.clock_bridge.clone(),
                RenderConfig::default(),
            );
            render_loop.run(&mut link).await;
        }
    })
}

/// Intake task for one session's audio stream: reads ciphered RTP packets
/// off `data_port`, decodes them, and hands the resulting frames to
/// `Racked`. Runs until the socket errors or the task is aborted on
/// teardown.
fn spawn_audio_intake(
    data_port: u16,
    key: [u8; 32],
    sample_rate: u32,
    racked: Arc<Racked>,
    anchor: Arc<AnchorStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let socket = match UdpSocket::bind(("0.0.0.0", data_port)).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("failed to bind audio data port {data_port}: {e}");
                return;
            }
        };

        let decoder = FrameDecoder::new(key, sample_rate, SAMPLES_PER_AAC_FRAME);
        let mut buf = vec![0u8; 2048];

        loop {
            let len = match socket.recv(&mut buf).await {
                Ok(len) => len,
                Err(e) => {
                    tracing::warn!("audio data socket error: {e}");
                    break;
                }
            };

            // spec.md §4.3 SETRATEANCHORTIME: the rate bit gates spooling
            // into Racked, not anchor installation itself.
            if !anchor.is_playing().await {
                continue;
            }

            match decoder.decode(&buf[..len]) {
                Ok(frame) => racked.handoff(frame).await,
                Err(e) => tracing::debug!("dropped unusable audio packet: {e}"),
            }
        }
    })
}

/// Drive one accepted TCP connection's RTSP control-channel exchange:
/// decrypt/parse requests, dispatch them, react to the resulting events, and
/// write back encoded responses until the peer disconnects.
pub async fn run_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    handlers: Arc<Ap2Handlers>,
    pipeline: Arc<SharedPipeline>,
    setup_handler: Arc<SetupHandler>,
    rtsp_saver: Option<Arc<RtspSaver>>,
) {
    let mut connection = EncryptedConnection::new(peer_addr);
    let mut state = Ap2SessionState::Connected;
    let mut session_context = SessionContext::new(CONNECTION_IDLE_TIMEOUT);
    let session_id: Option<String> = None;
    let mut audio_task: Option<JoinHandle<()>> = None;
    let mut recv_buf = [0u8; 4096];
    let peer = peer_addr.to_string();

    loop {
        let n = match tokio::time::timeout(
            session_context.remaining(),
            stream.read(&mut recv_buf),
        )
        .await
        {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                tracing::debug!("connection from {peer_addr} read error: {e}");
                break;
            }
            Err(_) => {
                tracing::debug!("connection from {peer_addr} idle-timed out, tearing down");
                break;
            }
        };
        session_context.touch();

        if let Some(saver) = &rtsp_saver {
            saver.record_request(&peer, &recv_buf[..n]);
        }

        let requests = match connection.on_data(&recv_buf[..n]) {
            Ok(requests) => requests,
            Err(e) => {
                tracing::warn!("connection from {peer_addr} codec error: {e}");
                break;
            }
        };

        for request in requests {
            session_context.observe(&request);

            let context = Ap2RequestContext {
                state: &state,
                session_id: session_id.as_deref(),
                encrypted: connection.state() == ConnectionState::Encrypted,
                decrypt: None,
            };
            let result = handle_ap2_request(&request, &context, &handlers);

            if let Some(new_state) = result.new_state {
                state = new_state;
            }

            if let Some(event) = &result.event {
                handle_event(
                    event,
                    &mut connection,
                    &pipeline,
                    &setup_handler,
                    &mut audio_task,
                )
                .await;
            }

            let encoded = match connection.encode(&result.response) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("connection from {peer_addr} encode error: {e}");
                    break;
                }
            };
            if let Some(saver) = &rtsp_saver {
                saver.record_response(&peer, &encoded);
            }
            if stream.write_all(&encoded).await.is_err() {
                if let Some(task) = audio_task.take() {
                    task.abort();
                }
                return;
            }
        }
    }

    if let Some(task) = audio_task.take() {
        task.abort();
    }
    tracing::debug!("connection from {peer_addr} closed");
}

async fn handle_event(
    event: &Ap2Event,
    connection: &mut EncryptedConnection,
    pipeline: &Arc<SharedPipeline>,
    setup_handler: &Arc<SetupHandler>,
    audio_task: &mut Option<JoinHandle<()>>,
) {
    match event {
        Ap2Event::PairingComplete {
            encrypt_key,
            decrypt_key,
        } => {
            connection.enable_encryption(*encrypt_key, *decrypt_key);
        }

        Ap2Event::SetupPhase2Complete {
            audio_data_port,
            audio_format,
            shared_key,
            ..
        } => {
            let Some(key_bytes) = shared_key.as_ref() else {
                tracing::warn!("SETUP phase 2 completed without a shared audio key");
                return;
            };
            let Ok(key): Result<[u8; 32], _> = key_bytes.as_slice().try_into() else {
                tracing::warn!("shared audio key was not 32 bytes");
                return;
            };
            let sample_rate = audio_format
                .as_ref()
                .map(|f| f.sample_rate)
                .unwrap_or(DEFAULT_SAMPLE_RATE);

            if let Some(task) = audio_task.take() {
                task.abort();
            }
            *audio_task = Some(spawn_audio_intake(
                *audio_data_port,
                key,
                sample_rate,
                pipeline.racked.clone(),
                pipeline.anchor.clone(),
            ));
        }

        Ap2Event::TimingPeersUpdated { peers } => {
            let clock_bridge = pipeline.clock_bridge.clone();
            let peers = peers.clone();
            tokio::spawn(async move {
                let bridge = clock_bridge.lock().await;
                if let Err(e) = bridge.publish_peers(&peers).await {
                    tracing::warn!("failed to publish timing peers: {e}");
                }
            });
        }

        Ap2Event::AnchorInstalled {
            rtp_time,
            network_time_ns,
            clock_id,
            rate,
        } => {
            // spec.md §4.3: SETRATEANCHORTIME always installs an anchor;
            // `rate` bit 0 only enables/disables spooling into Racked
            // (enforced in `spawn_audio_intake` via `AnchorStore::is_playing`).
            let anchor = AnchorData {
                rtp_time: *rtp_time,
                network_time_ns: *network_time_ns,
                clock_id: *clock_id,
                rate: *rate,
            };
            pipeline.anchor.replace(anchor).await;
        }

        Ap2Event::FlushBufferedRequested { flush_info } => {
            pipeline.racked.flush(*flush_info).await;
        }

        Ap2Event::FlushRequested {
            until_sequence,
            until_timestamp,
        } => {
            let flush = match (until_sequence, until_timestamp) {
                (Some(seq), Some(ts)) => {
                    FlushInfo::bounded(0, 0, u32::from(*seq), *ts)
                }
                _ => FlushInfo::all(FlushKind::Normal),
            };
            pipeline.racked.flush(flush).await;
        }

        Ap2Event::Teardown => {
            if let Some(task) = audio_task.take() {
                task.abort();
            }
            pipeline.racked.flush(FlushInfo::all(FlushKind::Complete)).await;
            pipeline.anchor.reset().await;
            setup_handler.cleanup();
        }

        _ => {}
    }
}
