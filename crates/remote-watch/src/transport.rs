//! TCP link to the companion process.
//!
//! `spawn_peer` keeps one connection alive: connect, post `PeerEvent::Opened`
//! with a `PeerLink` the core can write through, forward every inbound frame
//! as `PeerEvent::Message`, and post `PeerEvent::Closed` when the socket goes
//! away.  Then wait and try again.  Sends never block and are never queued
//! across a disconnect.

use std::time::Duration;

use remote_proto::protocol::{Message, MAX_FRAME_LEN};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::{ClientEvent, PeerEvent};
use crate::error::TransportError;

/// Write side of an open link.  Cheap to clone; every clone feeds the same
/// writer task.
#[derive(Debug, Clone)]
pub struct PeerLink {
    frames: mpsc::UnboundedSender<Vec<u8>>,
}

impl PeerLink {
    pub fn new(frames: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { frames }
    }

    pub fn is_open(&self) -> bool {
        !self.frames.is_closed()
    }

    /// Encode and hand a message to the writer task.  Fire-and-forget.
    pub fn send(&self, msg: &Message) -> Result<(), TransportError> {
        let frame = msg
            .encode()
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        self.frames.send(frame).map_err(|_| TransportError::Closed)
    }
}

/// Run the connect/read/reconnect loop until the core's event channel closes.
pub fn spawn_peer(
    address: String,
    retry: Duration,
    event_tx: mpsc::Sender<ClientEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match TcpStream::connect(&address).await {
                Ok(stream) => {
                    info!("Connected to companion at {}", address);
                    if run_link(stream, &event_tx).await.is_err() {
                        break;
                    }
                    info!("Companion link at {} closed", address);
                }
                Err(e) => {
                    debug!("Companion at {} unreachable: {}", address, e);
                }
            }

            if event_tx.is_closed() {
                break;
            }
            tokio::time::sleep(retry).await;
        }
        debug!("peer task exiting");
    })
}

/// Own one connection until it drops.  `Err` means the core is gone and the
/// caller should stop reconnecting.
async fn run_link(stream: TcpStream, event_tx: &mpsc::Sender<ClientEvent>) -> Result<(), ()> {
    let (mut read_half, mut write_half) = stream.into_split();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    let writer = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if let Err(e) = write_half.write_all(&frame).await {
                warn!("Write to companion failed: {}", e);
                break;
            }
        }
    });

    if !post(event_tx, PeerEvent::Opened(PeerLink::new(frame_tx))).await {
        writer.abort();
        return Err(());
    }

    let mut tmp = [0u8; 4096];
    let mut read_buf: Vec<u8> = Vec::new();
    let mut core_alive = true;

    'read: loop {
        match read_half.read(&mut tmp).await {
            Ok(0) => break,
            Ok(n) => {
                read_buf.extend_from_slice(&tmp[..n]);
                let frames = match split_frames(&mut read_buf) {
                    Ok(frames) => frames,
                    Err(e) => {
                        core_alive = post(event_tx, PeerEvent::Error(e)).await;
                        break;
                    }
                };
                for frame in frames {
                    match frame {
                        Ok(msg) => {
                            if !post(event_tx, PeerEvent::Message(msg)).await {
                                core_alive = false;
                                break 'read;
                            }
                        }
                        Err(e) => warn!("Dropping frame from companion: {}", e),
                    }
                }
            }
            Err(e) => {
                core_alive = post(event_tx, PeerEvent::Error(TransportError::Io(e))).await;
                break;
            }
        }
    }

    writer.abort();
    if !core_alive || !post(event_tx, PeerEvent::Closed).await {
        return Err(());
    }
    Ok(())
}

/// Forward a link event to the core.  `false` once the core has gone away.
async fn post(event_tx: &mpsc::Sender<ClientEvent>, evt: PeerEvent) -> bool {
    event_tx.send(ClientEvent::Peer(evt)).await.is_ok()
}

/// Pull every complete frame off the front of `read_buf`.  A frame whose body
/// does not decode is reported and skipped; an oversized header poisons the
/// stream and fails the whole call.
fn split_frames(
    read_buf: &mut Vec<u8>,
) -> Result<Vec<Result<Message, TransportError>>, TransportError> {
    let mut out = Vec::new();
    loop {
        if let Some(announced) = Message::announced_len(read_buf) {
            if announced > MAX_FRAME_LEN {
                return Err(TransportError::FrameTooLarge(announced));
            }
        }
        let Some(total) = Message::frame_len(read_buf) else {
            break;
        };
        let decoded = Message::decode(&read_buf[..total])
            .map(|(msg, _)| msg)
            .map_err(|e| TransportError::Decode(e.to_string()));
        out.push(decoded);
        read_buf.drain(..total);
    }
    Ok(out)
}
