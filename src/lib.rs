//! Netgate - connection acceptance and packet framing for realtime servers
//!
//! # Architecture (Accept Pipeline)
//!
//! ```text
//! Listener (TCP / WebSocket, optional TLS)
//! → Acceptor
//! → Handoff (single-slot queue)
//! → Conn (framed reads, raw reads/writes, deadlines)
//! → PacketCodec (encode/decode [Type|Length|Data])
//! ```
//!
//! ## Core Principles
//!
//! - One connection contract, two transports behind it
//! - Acceptors own their listener state; callers only hold the trait
//! - Backpressure by construction: the handoff queue holds one connection
//! - The codec is pure and carries no socket state
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── acceptor/        # TCP + WebSocket acceptors, TLS identity
//! ├── codec/           # Packet framing: header, envelope, types
//! ├── conn.rs          # Conn trait, boxed streams, deadlines
//! ├── handoff.rs       # Capacity-1 connection queue
//! └── error.rs         # Error taxonomy
//! ```

// Core types
pub mod conn;
pub mod error;

// Accept pipeline
pub mod acceptor;
pub mod codec;
pub mod handoff;

// Re-exports for convenience
pub use conn::{AsyncReadWrite, BoxedConn, Conn, IntoStream, Stream};
pub use error::{Error, Result};

// Architecture re-exports
pub use acceptor::{Acceptor, TcpAcceptor, TlsIdentity, WsAcceptor};
pub use codec::{
    decode_length, encode_length, parse_header, Packet, PacketCodec, PacketType, HEADER_LEN,
    MAX_PACKET_SIZE,
};
pub use handoff::{handoff, Handoff, HandoffReceiver};
