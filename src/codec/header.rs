//! Header encode and parse primitives

use crate::error::{Error, Result};

use super::{PacketType, HEADER_LEN, MAX_PACKET_SIZE};

/// Encodes a payload length as three big-endian bytes, most significant
/// byte first, truncating to 24 bits.
pub fn encode_length(n: usize) -> [u8; 3] {
    [(n >> 16) as u8, (n >> 8) as u8, n as u8]
}

/// Accumulates a big-endian unsigned integer over a slice of any length.
pub fn decode_length(bytes: &[u8]) -> usize {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | b as usize)
}

/// Splits a raw header into declared payload size and packet type.
///
/// Checks run in a fixed order: header length, then type byte, then the
/// declared size against [`MAX_PACKET_SIZE`].
pub fn parse_header(header: &[u8]) -> Result<(usize, PacketType)> {
    if header.len() != HEADER_LEN {
        return Err(Error::InvalidHeader);
    }
    let kind = PacketType::try_from(header[0])?;
    let size = decode_length(&header[1..HEADER_LEN]);
    if size > MAX_PACKET_SIZE {
        return Err(Error::PacketSizeExceed);
    }
    Ok((size, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_round_trips_over_three_bytes() {
        for n in [0usize, 1, 255, 256, 0x00ff_ffff] {
            let encoded = encode_length(n);
            assert_eq!(decode_length(&encoded), n);
        }
    }

    #[test]
    fn decode_length_accumulates_any_width() {
        assert_eq!(decode_length(&[]), 0);
        assert_eq!(decode_length(&[0x01]), 1);
        assert_eq!(decode_length(&[0x01, 0x00]), 256);
        assert_eq!(decode_length(&[0x01, 0x00, 0x00, 0x00]), 1 << 24);
    }

    #[test]
    fn parse_header_accepts_every_valid_type() {
        let cases = [
            (PacketType::Handshake, 0x01u8),
            (PacketType::HandshakeAck, 0x02),
            (PacketType::Heartbeat, 0x03),
            (PacketType::Data, 0x04),
            (PacketType::Kick, 0x05),
        ];
        for (kind, byte) in cases {
            let header = [byte, 0x00, 0x00, 0x02];
            let (size, parsed) = parse_header(&header).unwrap();
            assert_eq!(size, 2);
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn parse_header_rejects_wrong_slice_length() {
        assert!(matches!(
            parse_header(&[0x01, 0x00, 0x00]),
            Err(Error::InvalidHeader)
        ));
        assert!(matches!(
            parse_header(&[0x01, 0x00, 0x00, 0x00, 0x00]),
            Err(Error::InvalidHeader)
        ));
    }

    #[test]
    fn parse_header_rejects_type_bytes_outside_range() {
        for byte in [0x00u8, 0x06, 0xff] {
            let header = [byte, 0x00, 0x00, 0x01];
            assert!(matches!(parse_header(&header), Err(Error::WrongPacketType)));
        }
    }
}
