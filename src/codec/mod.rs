//! Packet framing codec
//!
//! Every frame on the wire is `[Type:1][Length:3][Payload:Length]`:
//! - Type: one byte, see [`PacketType`]
//! - Length: payload size as a 24-bit big-endian unsigned integer
//! - Payload: exactly `Length` bytes, opaque to this layer
//!
//! The codec is pure and stateless; both transports share it unchanged.

mod header;
mod packet;

pub use header::{decode_length, encode_length, parse_header};
pub use packet::PacketCodec;

use std::fmt;

use crate::error::{Error, Result};

/// Number of bytes in a frame header.
pub const HEADER_LEN: usize = 4;

/// Cap on the payload length a frame may declare.
pub const MAX_PACKET_SIZE: usize = 1 << 24;

/// Frame type byte.
///
/// Wire values are fixed; bytes outside `1..=5` are rejected at the
/// [`TryFrom<u8>`] boundary with [`Error::WrongPacketType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Client-initiated handshake request.
    Handshake = 1,
    /// Client acknowledgement completing the handshake.
    HandshakeAck = 2,
    /// Liveness probe, either direction.
    Heartbeat = 3,
    /// Application data.
    Data = 4,
    /// Server-initiated disconnect notice.
    Kick = 5,
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(PacketType::Handshake),
            2 => Ok(PacketType::HandshakeAck),
            3 => Ok(PacketType::Heartbeat),
            4 => Ok(PacketType::Data),
            5 => Ok(PacketType::Kick),
            _ => Err(Error::WrongPacketType),
        }
    }
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketType,
    pub length: usize,
    pub data: Vec<u8>,
}

impl Packet {
    /// Builds a packet; `length` always mirrors `data.len()`.
    pub fn new(kind: PacketType, data: Vec<u8>) -> Self {
        let length = data.len();
        Packet { kind, length, data }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Type: {}, Length: {}, Data: {}",
            self.kind as u8,
            self.length,
            String::from_utf8_lossy(&self.data)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_conversion_covers_the_wire_range() {
        assert!(matches!(PacketType::try_from(0), Err(Error::WrongPacketType)));
        for byte in 1..=5u8 {
            assert_eq!(PacketType::try_from(byte).unwrap() as u8, byte);
        }
        assert!(matches!(PacketType::try_from(6), Err(Error::WrongPacketType)));
    }

    #[test]
    fn packet_length_mirrors_data() {
        let packet = Packet::new(PacketType::Data, b"abc".to_vec());
        assert_eq!(packet.length, 3);
        assert_eq!(packet.to_string(), "Type: 4, Length: 3, Data: abc");
    }
}
