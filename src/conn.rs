//! Connection contract shared by both transports
//!
//! This module defines the core connection types:
//! - Stream: unified async I/O over plain and TLS sockets
//! - Conn: the capability set every accepted connection exposes
//! - BoxedConn: the owned form handed through the handoff queue

use std::future::Future;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;

use crate::error::{Error, Result};

/// Boxed async read/write stream, the one type both transports accept
/// behind regardless of TLS.
pub type Stream = Box<dyn AsyncReadWrite + Unpin + Send>;

/// Combined trait for async read + write
pub trait AsyncReadWrite: AsyncRead + AsyncWrite {}

/// Blanket implementation for any type implementing both
impl<T: AsyncRead + AsyncWrite> AsyncReadWrite for T {}

/// Helper trait to convert concrete socket types into [`Stream`]
pub trait IntoStream {
    fn into_stream(self) -> Stream;
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> IntoStream for T {
    fn into_stream(self) -> Stream {
        Box::new(self)
    }
}

/// An accepted connection, as claimed from an acceptor.
///
/// The claimant owns the connection exclusively; nothing here synchronizes
/// concurrent readers. Frames are delivered in wire order.
#[async_trait]
pub trait Conn: Send {
    /// Reads one whole frame, header included.
    async fn get_next_message(&mut self) -> Result<Vec<u8>>;

    /// Byte-stream read. On the message transport this drains the current
    /// message before lazily pulling the next one.
    async fn read_raw(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Writes the entire buffer. The message transport emits it as exactly
    /// one binary message.
    async fn write_raw(&mut self, buf: &[u8]) -> Result<usize>;

    /// Closes the connection.
    async fn close(&mut self) -> Result<()>;

    fn local_addr(&self) -> Option<SocketAddr>;

    fn remote_addr(&self) -> Option<SocketAddr>;

    /// Absolute deadline applied to subsequent reads; `None` clears it.
    fn set_read_deadline(&mut self, deadline: Option<Instant>);

    /// Absolute deadline applied to subsequent writes; `None` clears it.
    fn set_write_deadline(&mut self, deadline: Option<Instant>);

    /// Sets both deadlines at once.
    fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }
}

/// Owned trait object for accepted connections.
pub type BoxedConn = Box<dyn Conn>;

/// Per-direction absolute deadlines.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Deadlines {
    pub read: Option<Instant>,
    pub write: Option<Instant>,
}

/// Runs `fut` under an optional deadline, mapping expiry to
/// [`Error::Timeout`].
pub(crate) async fn with_deadline<F, T>(deadline: Option<Instant>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(at) => match tokio::time::timeout_at(at, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        },
        None => fut.await,
    }
}
