//! Message-transport acceptor
//!
//! The upgrade handshake is serviced off the accept loop so a slow client
//! cannot stall acceptance. Upgraded connections carry one frame per
//! binary message; `read_raw` additionally adapts whole messages to a
//! byte-stream contract by draining a current-message buffer and lazily
//! pulling the next message when it runs out.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::protocol::{Message, WebSocketConfig};
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{accept_async_with_config, WebSocketStream};
use tracing::{debug, error};

use crate::codec::{parse_header, HEADER_LEN, MAX_PACKET_SIZE};
use crate::conn::{with_deadline, BoxedConn, Conn, Deadlines, IntoStream, Stream};
use crate::error::{Error, Result};
use crate::handoff::{handoff, Handoff, HandoffReceiver};

use super::tls::{identity_from_paths, TlsIdentity};
use super::Acceptor;

/// Read/write buffer sizing for the upgrade. Fixed, not configurable.
const IO_BUFFER_SIZE: usize = 4096;

/// Accepts message-transport connections and offers the upgraded results
/// through the handoff queue.
pub struct WsAcceptor {
    addr: String,
    tls: Option<TlsIdentity>,
    running: AtomicBool,
    bound_addr: Mutex<Option<SocketAddr>>,
    conn_tx: Handoff<BoxedConn>,
    incoming: Mutex<Option<HandoffReceiver<BoxedConn>>>,
    shutdown: broadcast::Sender<()>,
}

impl WsAcceptor {
    /// Creates an acceptor for `addr`. `certs` must hold zero paths (plain
    /// transport) or exactly two (certificate file, then key file).
    pub fn new(addr: &str, certs: &[String]) -> Result<Self> {
        let tls = identity_from_paths(certs)?;
        let (conn_tx, incoming) = handoff();
        let (shutdown, _) = broadcast::channel(1);
        Ok(Self {
            addr: addr.to_string(),
            tls,
            running: AtomicBool::new(false),
            bound_addr: Mutex::new(None),
            conn_tx,
            incoming: Mutex::new(Some(incoming)),
            shutdown,
        })
    }

    async fn serve(&self, listener: TcpListener, tls_acceptor: Option<TlsAcceptor>) -> Result<()> {
        let mut shutdown_rx = self.shutdown.subscribe();

        while self.running.load(Ordering::SeqCst) && !self.conn_tx.is_closed() {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            error!("Failed to accept WebSocket connection: {}", e);
                            continue;
                        }
                    };
                    let local = socket.local_addr().ok();
                    let _ = socket.set_nodelay(true);

                    // each upgrade runs on its own task; the handoff queue
                    // stays the single serialization point
                    let conn_tx = self.conn_tx.clone();
                    let tls_acceptor = tls_acceptor.clone();
                    tokio::spawn(async move {
                        let stream: Stream = match tls_acceptor {
                            Some(acceptor) => match acceptor.accept(socket).await {
                                Ok(tls) => tls.into_stream(),
                                Err(e) => {
                                    error!("TLS handshake failed for {}: {}", peer, e);
                                    return;
                                }
                            },
                            None => socket.into_stream(),
                        };

                        match upgrade(stream).await {
                            Ok(ws) => {
                                let conn = WsConn::new(ws, local, Some(peer));
                                if conn_tx.offer(Box::new(conn)).await.is_err() {
                                    debug!(
                                        "Connection consumer is gone, dropping upgrade from {}",
                                        peer
                                    );
                                }
                            }
                            Err(e) => {
                                error!("WebSocket upgrade failed for {}: {}", peer, e);
                            }
                        }
                    });
                }
                _ = shutdown_rx.recv() => break,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Acceptor for WsAcceptor {
    async fn listen_and_serve(&self) -> Result<()> {
        let tls_acceptor = match &self.tls {
            Some(identity) => Some(identity.build_acceptor()?),
            None => None,
        };

        let listener = TcpListener::bind(&self.addr).await?;
        *self.bound_addr.lock() = listener.local_addr().ok();
        self.running.store(true, Ordering::SeqCst);

        let result = self.serve(listener, tls_acceptor).await;
        self.stop();
        result
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(());
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound_addr.lock()
    }

    fn take_incoming(&self) -> Option<HandoffReceiver<BoxedConn>> {
        self.incoming.lock().take()
    }
}

/// Performs the HTTP upgrade with the protocol's fixed buffer sizing. All
/// origins are accepted; the handshake performs no Origin gate.
async fn upgrade(stream: Stream) -> Result<WebSocketStream<BufReader<Stream>>> {
    let mut config = WebSocketConfig::default();
    config.write_buffer_size = IO_BUFFER_SIZE;
    config.max_message_size = Some(HEADER_LEN + MAX_PACKET_SIZE);
    config.max_frame_size = Some(HEADER_LEN + MAX_PACKET_SIZE);
    let buffered = BufReader::with_capacity(IO_BUFFER_SIZE, stream);
    accept_async_with_config(buffered, Some(config))
        .await
        .map_err(|e| Error::Transport(format!("WebSocket upgrade: {}", e)))
}

fn ws_error(e: WsError) -> Error {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => Error::ConnectionClosed,
        WsError::Io(e) => Error::Io(e),
        other => Error::Transport(other.to_string()),
    }
}

/// One upgraded message connection.
struct WsConn {
    ws: WebSocketStream<BufReader<Stream>>,
    pending: Bytes,
    local: Option<SocketAddr>,
    peer: Option<SocketAddr>,
    deadlines: Deadlines,
}

impl WsConn {
    fn new(
        ws: WebSocketStream<BufReader<Stream>>,
        local: Option<SocketAddr>,
        peer: Option<SocketAddr>,
    ) -> Self {
        Self {
            ws,
            pending: Bytes::new(),
            local,
            peer,
            deadlines: Deadlines::default(),
        }
    }

    /// Pulls the next data-bearing message, consuming control frames.
    async fn next_data_message(&mut self) -> Result<Vec<u8>> {
        loop {
            let message = match self.ws.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(ws_error(e)),
                None => return Err(Error::ConnectionClosed),
            };
            match message {
                Message::Binary(data) => return Ok(data),
                Message::Text(text) => return Ok(text.into_bytes()),
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => return Err(Error::ConnectionClosed),
                Message::Frame(_) => {
                    return Err(Error::Transport("unexpected raw frame".to_string()))
                }
            }
        }
    }
}

#[async_trait]
impl Conn for WsConn {
    async fn get_next_message(&mut self) -> Result<Vec<u8>> {
        let deadline = self.deadlines.read;
        let message = with_deadline(deadline, self.next_data_message()).await?;

        if message.len() < HEADER_LEN {
            return Err(Error::InvalidHeader);
        }
        let (size, _) = parse_header(&message[..HEADER_LEN])?;

        let payload_len = message.len() - HEADER_LEN;
        if payload_len < size {
            return Err(Error::ReceivedMsgSmallerThanExpected);
        }
        if payload_len > size {
            return Err(Error::ReceivedMsgBiggerThanExpected);
        }
        Ok(message)
    }

    async fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // drain the current message first; empty messages are skipped.
        // a closed transport is end-of-stream for the raw contract.
        while self.pending.is_empty() {
            let deadline = self.deadlines.read;
            let data = match with_deadline(deadline, self.next_data_message()).await {
                Ok(data) => data,
                Err(Error::ConnectionClosed) => return Ok(0),
                Err(e) => return Err(e),
            };
            self.pending = Bytes::from(data);
        }

        let n = buf.len().min(self.pending.len());
        let chunk = self.pending.split_to(n);
        buf[..n].copy_from_slice(&chunk);
        Ok(n)
    }

    async fn write_raw(&mut self, buf: &[u8]) -> Result<usize> {
        let deadline = self.deadlines.write;
        with_deadline(deadline, async {
            self.ws
                .send(Message::Binary(buf.to_vec()))
                .await
                .map_err(ws_error)
        })
        .await?;
        Ok(buf.len())
    }

    async fn close(&mut self) -> Result<()> {
        match self.ws.close(None).await {
            Ok(()) => Ok(()),
            Err(e) => match ws_error(e) {
                Error::ConnectionClosed => Ok(()),
                other => Err(other),
            },
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) {
        self.deadlines.read = deadline;
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) {
        self.deadlines.write = deadline;
    }
}
