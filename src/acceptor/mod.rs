//! Transport acceptors
//!
//! This module defines the acceptance side of the layer:
//! - Acceptor: the uniform contract over both transports
//! - tcp: stream transport, frames delimited only by exact header reads
//! - ws: message transport, one frame per upgraded message
//! - tls: credential loading shared by the secured variants
//!
//! Each acceptor owns its listening socket, a capacity-1 handoff queue and
//! a running flag. Accepted connections are offered through the queue and
//! claimed by a single consumer.

mod tcp;
mod tls;
mod ws;

pub use tcp::TcpAcceptor;
pub use tls::TlsIdentity;
pub use ws::WsAcceptor;

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::conn::BoxedConn;
use crate::error::Result;
use crate::handoff::HandoffReceiver;

/// Uniform contract over the transport acceptors.
#[async_trait]
pub trait Acceptor: Send + Sync {
    /// Binds the listening socket and runs the accept loop until stopped.
    /// Bind and credential-load failures are returned before the loop
    /// starts and are fatal to this acceptor only.
    async fn listen_and_serve(&self) -> Result<()>;

    /// Marks the acceptor not-running and closes the listening socket,
    /// terminating the accept loop. Idempotent in effect; connections
    /// already handed off are untouched. The acceptor cannot be reused.
    fn stop(&self);

    /// The bound address once listening.
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Takes the claim side of the handoff queue. Yields `Some` exactly
    /// once.
    fn take_incoming(&self) -> Option<HandoffReceiver<BoxedConn>>;
}
