//! Whole-frame encode and stateless multi-frame decode

use crate::error::{Error, Result};

use super::{encode_length, parse_header, Packet, PacketType, HEADER_LEN, MAX_PACKET_SIZE};

/// Stateless frame codec shared by every transport.
///
/// `decode` expects whole frames: the connection layer reads exact frame
/// boundaries before handing buffers here, so a partial trailing frame is
/// dropped rather than carried between calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketCodec;

impl PacketCodec {
    pub fn new() -> Self {
        PacketCodec
    }

    /// Builds one wire frame: type byte, 24-bit length, payload.
    pub fn encode(&self, kind: PacketType, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() > MAX_PACKET_SIZE {
            return Err(Error::PacketSizeExceed);
        }
        let mut buf = Vec::with_capacity(HEADER_LEN + data.len());
        buf.push(kind as u8);
        buf.extend_from_slice(&encode_length(data.len()));
        buf.extend_from_slice(data);
        Ok(buf)
    }

    /// Extracts every whole frame from `buf`, in order.
    ///
    /// Fewer than four bytes is not a fault: the result is empty. A header
    /// fault anywhere aborts the whole call.
    pub fn decode(&self, mut buf: &[u8]) -> Result<Vec<Packet>> {
        let mut packets = Vec::new();
        if buf.len() < HEADER_LEN {
            return Ok(packets);
        }

        let (mut size, mut kind) = parse_header(&buf[..HEADER_LEN])?;
        buf = &buf[HEADER_LEN..];

        while size <= buf.len() {
            packets.push(Packet::new(kind, buf[..size].to_vec()));
            buf = &buf[size..];

            if buf.len() < HEADER_LEN {
                break;
            }
            let next = parse_header(&buf[..HEADER_LEN])?;
            size = next.0;
            kind = next.1;
            buf = &buf[HEADER_LEN..];
        }

        Ok(packets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(kind: u8, data: &[u8]) -> Vec<u8> {
        let mut buf = vec![kind];
        buf.extend_from_slice(&encode_length(data.len()));
        buf.extend_from_slice(data);
        buf
    }

    #[test]
    fn encode_produces_header_then_payload() {
        let codec = PacketCodec::new();
        let encoded = codec.encode(PacketType::Handshake, &[0x01, 0x00]).unwrap();
        assert_eq!(encoded, vec![0x01, 0x00, 0x00, 0x02, 0x01, 0x00]);
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let codec = PacketCodec::new();
        let data = vec![0u8; MAX_PACKET_SIZE + 1];
        assert!(matches!(
            codec.encode(PacketType::Data, &data),
            Err(Error::PacketSizeExceed)
        ));
    }

    #[test]
    fn round_trip_for_every_type() {
        let codec = PacketCodec::new();
        let types = [
            PacketType::Handshake,
            PacketType::HandshakeAck,
            PacketType::Heartbeat,
            PacketType::Data,
            PacketType::Kick,
        ];
        for kind in types {
            let encoded = codec.encode(kind, b"hello").unwrap();
            let packets = codec.decode(&encoded).unwrap();
            assert_eq!(packets, vec![Packet::new(kind, b"hello".to_vec())]);
        }
    }

    #[test]
    fn decode_returns_empty_on_insufficient_bytes() {
        let codec = PacketCodec::new();
        assert!(codec.decode(&[]).unwrap().is_empty());
        assert!(codec.decode(&[0x01, 0x00, 0x00]).unwrap().is_empty());
    }

    #[test]
    fn decode_returns_empty_on_partial_payload() {
        let codec = PacketCodec::new();
        // header declares two bytes, only one present
        let packets = codec.decode(&[0x01, 0x00, 0x00, 0x02, 0x01]).unwrap();
        assert!(packets.is_empty());
    }

    #[test]
    fn decode_propagates_header_faults() {
        let codec = PacketCodec::new();
        let buf = frame(0xff, &[0x01]);
        assert!(matches!(codec.decode(&buf), Err(Error::WrongPacketType)));
    }

    #[test]
    fn decode_extracts_consecutive_frames_in_order() {
        let codec = PacketCodec::new();
        let mut buf = frame(0x01, b"one");
        buf.extend_from_slice(&frame(0x04, b"two"));
        let packets = codec.decode(&buf).unwrap();
        assert_eq!(
            packets,
            vec![
                Packet::new(PacketType::Handshake, b"one".to_vec()),
                Packet::new(PacketType::Data, b"two".to_vec()),
            ]
        );
    }

    #[test]
    fn decode_faults_mid_buffer_abort_the_call() {
        let codec = PacketCodec::new();
        let mut buf = frame(0x01, b"ok");
        buf.extend_from_slice(&frame(0x06, b"bad"));
        assert!(matches!(codec.decode(&buf), Err(Error::WrongPacketType)));
    }
}
