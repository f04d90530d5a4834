//! Stream-transport acceptor
//!
//! Stream sockets carry no message boundaries, so connections delimit
//! frames themselves: read exactly four header bytes, parse the declared
//! size, read exactly that many payload bytes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error};

use crate::codec::{parse_header, HEADER_LEN};
use crate::conn::{with_deadline, BoxedConn, Conn, Deadlines, IntoStream, Stream};
use crate::error::{Error, Result};
use crate::handoff::{handoff, Handoff, HandoffReceiver};

use super::tls::{identity_from_paths, TlsIdentity};
use super::Acceptor;

/// Accepts stream-transport connections and offers them through the
/// handoff queue.
pub struct TcpAcceptor {
    addr: String,
    tls: Option<TlsIdentity>,
    running: AtomicBool,
    bound_addr: Mutex<Option<SocketAddr>>,
    conn_tx: Handoff<BoxedConn>,
    incoming: Mutex<Option<HandoffReceiver<BoxedConn>>>,
    shutdown: broadcast::Sender<()>,
}

impl TcpAcceptor {
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

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            error!("Failed to accept TCP connection: {}", e);
                            continue;
                        }
                    };
                    let local = socket.local_addr().ok();
                    let _ = socket.set_nodelay(true);

                    let stream: Stream = match &tls_acceptor {
                        Some(acceptor) => match acceptor.accept(socket).await {
                            Ok(tls) => tls.into_stream(),
                            Err(e) => {
                                error!("TLS handshake failed for {}: {}", peer, e);
                                continue;
                            }
                        },
                        None => socket.into_stream(),
                    };

                    let conn = TcpConn::new(stream, local, Some(peer));
                    if self.conn_tx.offer(Box::new(conn)).await.is_err() {
                        debug!("Connection consumer is gone, stopping accept loop");
                        break;
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Acceptor for TcpAcceptor {
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

/// One accepted stream connection.
struct TcpConn {
    stream: Stream,
    local: Option<SocketAddr>,
    peer: Option<SocketAddr>,
    deadlines: Deadlines,
}

impl TcpConn {
    fn new(stream: Stream, local: Option<SocketAddr>, peer: Option<SocketAddr>) -> Self {
        Self {
            stream,
            local,
            peer,
            deadlines: Deadlines::default(),
        }
    }

    /// Reads until `buf` is full or the stream ends, returning how many
    /// bytes arrived.
    async fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let deadline = self.deadlines.read;
            let n = with_deadline(deadline, async {
                self.stream.read(&mut buf[filled..]).await.map_err(Error::from)
            })
            .await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

#[async_trait]
impl Conn for TcpConn {
    async fn get_next_message(&mut self) -> Result<Vec<u8>> {
        let mut frame = vec![0u8; HEADER_LEN];
        let got = self.read_full(&mut frame).await?;
        if got == 0 {
            return Err(Error::ConnectionClosed);
        }
        if got < HEADER_LEN {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream ended inside a frame header",
            )));
        }

        let (size, _) = parse_header(&frame)?;

        frame.resize(HEADER_LEN + size, 0);
        let got = self.read_full(&mut frame[HEADER_LEN..]).await?;
        if got < size {
            return Err(Error::ReceivedMsgSmallerThanExpected);
        }
        Ok(frame)
    }

    async fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        let deadline = self.deadlines.read;
        with_deadline(deadline, async {
            self.stream.read(buf).await.map_err(Error::from)
        })
        .await
    }

    async fn write_raw(&mut self, buf: &[u8]) -> Result<usize> {
        let deadline = self.deadlines.write;
        with_deadline(deadline, async {
            self.stream.write_all(buf).await.map_err(Error::from)
        })
        .await?;
        Ok(buf.len())
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(Error::from)
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
