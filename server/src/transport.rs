//! TCP transport: accept loop, per-connection reader tasks, and the
//! outbound router that realizes the dispatch core's effects.
//!
//! Each inbound datagram is a 2-byte big-endian length followed by one
//! framed packet. Outbound, the same framing applies, except the one-time
//! world snapshot which goes out behind a `0xFFFF` length sentinel as a
//! 4-byte-length stream chunk.

use crate::connection::ConnId;
use crate::network::{Outbound, Server, ServerMessage};
use crate::utils::get_timestamp;
use log::{debug, error, info, warn};
use shared::packets::frame;
use shared::Packet;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Largest accepted inbound frame. Generously above any packet in the
/// catalogue; anything bigger is a protocol violation.
const MAX_FRAME_LEN: usize = 8 * 1024;

/// Length-field sentinel announcing a stream chunk instead of a datagram.
const STREAM_SENTINEL: u16 = 0xFFFF;

type Writers = Arc<RwLock<HashMap<ConnId, mpsc::UnboundedSender<Vec<u8>>>>>;

/// Owns the listener, the dispatch core, and the channel plumbing between
/// them. All socket I/O happens in spawned tasks; the core runs on the
/// main loop only.
pub struct Transport {
    listener: TcpListener,
    server: Server,
    in_tx: mpsc::UnboundedSender<ServerMessage>,
    in_rx: mpsc::UnboundedReceiver<ServerMessage>,
    out_rx: mpsc::UnboundedReceiver<Outbound>,
    writers: Writers,
    tick_duration: Duration,
}

impl Transport {
    /// Binds the listener and wires the core to its channels. `make_server`
    /// receives the outbound sender the core will emit effects on.
    pub async fn bind(
        addr: &str,
        tick_duration: Duration,
        make_server: impl FnOnce(mpsc::UnboundedSender<Outbound>) -> Server,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", addr);

        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        Ok(Transport {
            listener,
            server: make_server(out_tx),
            in_tx,
            in_rx,
            out_rx,
            writers: Arc::new(RwLock::new(HashMap::new())),
            tick_duration,
        })
    }

    /// Runs the accept loop, the outbound router, and the dispatch loop
    /// until the inbound channel closes.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        let writers = Arc::clone(&self.writers);
        tokio::spawn(route(self.out_rx, writers));

        let in_tx = self.in_tx.clone();
        let writers = Arc::clone(&self.writers);
        tokio::spawn(accept_loop(self.listener, in_tx, writers));

        let mut tick = interval(self.tick_duration);
        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.in_rx.recv() => {
                    match message {
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                        Some(message) => {
                            self.server.handle_message(message, get_timestamp());
                        }
                    }
                },
                _ = tick.tick() => {
                    self.server.tick(get_timestamp());
                },
            }
        }

        Ok(())
    }
}

/// Accepts connections, registers a writer for each, and spawns its
/// reader task. Connection ids are never reused within a process.
async fn accept_loop(
    listener: TcpListener,
    in_tx: mpsc::UnboundedSender<ServerMessage>,
    writers: Writers,
) {
    let next_id = AtomicU32::new(1);

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let id = next_id.fetch_add(1, Ordering::Relaxed);
                // Bans are per host, so the address the core sees is the
                // bare ip without the ephemeral port.
                let address = peer.ip().to_string();
                register_connection(stream, id, address, &in_tx, &writers).await;
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn register_connection(
    stream: TcpStream,
    id: ConnId,
    address: String,
    in_tx: &mpsc::UnboundedSender<ServerMessage>,
    writers: &Writers,
) {
    let (read_half, write_half) = stream.into_split();

    let (write_tx, write_rx) = mpsc::unbounded_channel();
    writers.write().await.insert(id, write_tx);
    tokio::spawn(write_frames(write_half, write_rx));

    if in_tx
        .send(ServerMessage::Connected { id, address })
        .is_err()
    {
        // Core is gone; the listener will be torn down with the process.
        return;
    }
    tokio::spawn(read_frames(
        read_half,
        id,
        in_tx.clone(),
        Arc::clone(writers),
    ));
}

/// Reads length-prefixed frames until EOF or a protocol violation, then
/// retires the connection's writer and reports the disconnect.
async fn read_frames(
    mut stream: OwnedReadHalf,
    id: ConnId,
    in_tx: mpsc::UnboundedSender<ServerMessage>,
    writers: Writers,
) {
    loop {
        let len = match stream.read_u16().await {
            Ok(len) => len as usize,
            Err(_) => break,
        };
        if len == 0 || len > MAX_FRAME_LEN {
            warn!("Connection {} sent a frame of invalid length {}", id, len);
            break;
        }
        let mut bytes = vec![0u8; len];
        if stream.read_exact(&mut bytes).await.is_err() {
            break;
        }
        if in_tx
            .send(ServerMessage::PacketReceived { id, bytes })
            .is_err()
        {
            return;
        }
    }

    writers.write().await.remove(&id);
    let _ = in_tx.send(ServerMessage::Disconnected { id });
}

/// Drains the connection's write queue onto the socket. Ends when the
/// queue closes, which is how the router hangs up on a kicked connection.
async fn write_frames(mut stream: OwnedWriteHalf, mut write_rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(bytes) = write_rx.recv().await {
        if let Err(e) = stream.write_all(&bytes).await {
            debug!("Write failed: {}", e);
            break;
        }
    }
    let _ = stream.shutdown().await;
}

/// Realizes every outbound effect from the core against the writer table.
async fn route(mut out_rx: mpsc::UnboundedReceiver<Outbound>, writers: Writers) {
    while let Some(out) = out_rx.recv().await {
        match out {
            Outbound::Unicast { id, packet } => {
                let Some(bytes) = datagram(&packet) else {
                    continue;
                };
                send_to(&writers, id, bytes).await;
            }
            Outbound::Broadcast { packet, exclude } => {
                let Some(bytes) = datagram(&packet) else {
                    continue;
                };
                let writers_guard = writers.read().await;
                for (&conn_id, write_tx) in writers_guard.iter() {
                    if Some(conn_id) == exclude {
                        continue;
                    }
                    if write_tx.send(bytes.clone()).is_err() {
                        debug!("Writer for connection {} is gone", conn_id);
                    }
                }
            }
            Outbound::Stream { id, bytes } => {
                let mut chunk = Vec::with_capacity(bytes.len() + 2);
                chunk.extend_from_slice(&STREAM_SENTINEL.to_be_bytes());
                chunk.extend_from_slice(&bytes);
                send_to(&writers, id, chunk).await;
            }
            Outbound::Close { id } => {
                // Dropping the sender closes the writer task and with it
                // the socket.
                writers.write().await.remove(&id);
            }
        }
    }
}

async fn send_to(writers: &Writers, id: ConnId, bytes: Vec<u8>) {
    let writers_guard = writers.read().await;
    match writers_guard.get(&id) {
        Some(write_tx) => {
            if write_tx.send(bytes).is_err() {
                debug!("Writer for connection {} is gone", id);
            }
        }
        None => debug!("No writer for connection {}", id),
    }
}

/// Wraps one framed packet in the 2-byte length prefix. A body too large
/// for the prefix (or colliding with the stream sentinel) cannot be framed
/// and is dropped rather than sent corrupt.
fn datagram(packet: &Packet) -> Option<Vec<u8>> {
    let body = frame(packet);
    if body.len() >= STREAM_SENTINEL as usize {
        error!(
            "Dropping oversized outbound packet tag {} ({} bytes)",
            packet.tag(),
            body.len()
        );
        return None;
    }
    let mut out = Vec::with_capacity(body.len() + 2);
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(&body);
    Some(out)
}
