//! TCP link between the watch side and the phone simulator.
//!
//! Each dictionary travels in a frame (see [`wyb_protocol::FrameCodec`]).
//! The watch side runs one task: a `select!` loop that feeds decoded
//! messages to the engine and writes out whatever requests it queued.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::Unit;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use wyb_engine::metrics::Metric;
use wyb_engine::{ChannelError, MessageChannel};
use wyb_protocol::{DeviceMessage, FrameCodec, ProtocolSession, Request};

use crate::app::{WatchApp, WatchReport};
use crate::config::{CatalogConfig, WatchConfig};
use crate::error::Result;
use crate::loopback::OUTBOX_CAPACITY;
use crate::phone::CompanionPhone;

/// Frames either side could not decode.
///
/// Labels: side
pub const FRAMES_DROPPED: Metric = Metric::counter("wyb.link.frames_dropped")
    .with_description("Frames dropped by the TCP link")
    .with_unit(Unit::Count)
    .with_labels(&["side"]);

/// How long the watch must stay silent before the phone sends a push.
pub const PUSH_AFTER_IDLE: Duration = Duration::from_millis(100);

// ============================================================================
// Watch Side
// ============================================================================

/// Outbound channel backed by a bounded tokio queue.
///
/// `send` never waits: a full or closed queue makes the channel unavailable.
#[derive(Debug, Clone)]
pub struct ChannelSender {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChannelSender {
    /// Wrap the sending half of a queue.
    pub fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        ChannelSender { tx }
    }
}

impl MessageChannel for ChannelSender {
    fn send(&mut self, dictionary: Vec<u8>) -> std::result::Result<(), ChannelError> {
        self.tx.try_send(dictionary).map_err(|_| ChannelError::Unavailable)
    }
}

/// Connect to the phone and run the watch app until the link closes, the run
/// finishes, or Ctrl-C.
pub async fn run_watch(config: WatchConfig) -> Result<WatchReport> {
    info!("Watch: connecting to {}", config.connect);
    let stream = TcpStream::connect(&config.connect).await?;
    run_watch_on(stream, config).await
}

/// Run the watch app over an established stream.
pub async fn run_watch_on(stream: TcpStream, config: WatchConfig) -> Result<WatchReport> {
    let (mut reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(OUTBOX_CAPACITY);

    let mut framing = ProtocolSession::new();
    let mut app = WatchApp::new(ChannelSender::new(tx), config);
    let mut buf = [0u8; 1024];

    app.start();

    loop {
        tokio::select! {
            result = reader.read(&mut buf) => {
                let n = result?;
                if n == 0 {
                    info!("Watch: phone closed the link");
                    break;
                }
                framing.feed(&buf[..n]);
                loop {
                    match framing.try_decode_dictionary() {
                        Ok(Some(dict)) => app.handle_dictionary(&dict),
                        Ok(None) => break,
                        Err(e) => {
                            warn!("Watch: dropping frame: {}", e);
                            metrics::counter!(FRAMES_DROPPED.name, "side" => "watch").increment(1);
                        }
                    }
                }
                if app.is_finished() {
                    debug!("Watch: run complete");
                    break;
                }
            }

            Some(dictionary) = rx.recv() => {
                trace!("Watch: -> {}", hex::encode(&dictionary));
                writer.write_all(&framing.frame(&dictionary)).await?;
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Watch: interrupted");
                break;
            }
        }
    }

    Ok(app.report())
}

// ============================================================================
// Phone Side
// ============================================================================

/// Bind `listen` and serve the catalog until Ctrl-C.
pub async fn run_phone(listen: &str, catalog: CatalogConfig) -> Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!("Phone: listening on {} with {} barcodes", listener.local_addr()?, catalog.len());

    tokio::select! {
        result = serve_phone(listener, catalog) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Phone: interrupted");
            Ok(())
        }
    }
}

/// Accept watch connections forever, each with its own phone state.
pub async fn serve_phone(listener: TcpListener, catalog: CatalogConfig) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let phone = CompanionPhone::new(catalog.clone());
        tokio::spawn(async move {
            if let Err(e) = handle_phone_connection(stream, peer, phone).await {
                warn!("Phone: connection from {} failed: {}", peer, e);
            }
        });
    }
}

/// Serve one watch connection.
///
/// Queued pushes go out one at a time, each after the watch has been quiet
/// for [`PUSH_AFTER_IDLE`].
async fn handle_phone_connection(mut stream: TcpStream, peer: SocketAddr, mut phone: CompanionPhone) -> Result<()> {
    info!("Phone: watch connected from {}", peer);
    let mut codec = FrameCodec::for_phone();
    let mut buf = [0u8; 1024];

    loop {
        let n = if phone.has_pushes() {
            match tokio::time::timeout(PUSH_AFTER_IDLE, stream.read(&mut buf)).await {
                Ok(result) => result?,
                Err(_) => {
                    if let Some(push) = phone.next_push() {
                        send_to_watch(&mut stream, &codec, &push).await?;
                    }
                    continue;
                }
            }
        } else {
            stream.read(&mut buf).await?
        };
        if n == 0 {
            info!("Phone: watch {} disconnected", peer);
            return Ok(());
        }
        codec.push(&buf[..n]);

        loop {
            let frame = match codec.decode() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!("Phone: dropping frame: {}", e);
                    metrics::counter!(FRAMES_DROPPED.name, "side" => "phone").increment(1);
                    continue;
                }
            };
            trace!("Phone: <- {}", hex::encode(&frame));

            let request = match Request::decode(&frame) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Phone: undecodable request: {}", e);
                    metrics::counter!(FRAMES_DROPPED.name, "side" => "phone").increment(1);
                    continue;
                }
            };

            for reply in phone.handle(request) {
                send_to_watch(&mut stream, &codec, &reply).await?;
            }
        }
    }
}

async fn send_to_watch(stream: &mut TcpStream, codec: &FrameCodec, message: &DeviceMessage) -> Result<()> {
    let bytes = message.encode()?;
    stream.write_all(&codec.encode(&bytes)).await?;
    Ok(())
}
