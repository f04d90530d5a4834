//! Error types for Netgate

use thiserror::Error;

/// Main error type for Netgate
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Acceptor construction received a credential-path count other than
    /// zero or two.
    #[error("certificates must be exactly two")]
    InvalidCertificates,

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Frame header shorter than four bytes, or not parseable as one.
    #[error("invalid header")]
    InvalidHeader,

    /// Type byte outside the valid range.
    #[error("wrong packet type")]
    WrongPacketType,

    /// Declared payload length above the protocol cap.
    #[error("codec: packet size exceed")]
    PacketSizeExceed,

    /// The transport ended before the declared payload length arrived.
    #[error("received less data than expected, EOF")]
    ReceivedMsgSmallerThanExpected,

    /// A whole message carried more payload than its header declared.
    #[error("received more data than expected")]
    ReceivedMsgBiggerThanExpected,

    #[error("client connection closed")]
    ConnectionClosed,

    /// A read or write deadline expired.
    #[error("Timeout")]
    Timeout,
}

/// Result type alias for Netgate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_messages_are_stable() {
        assert_eq!(
            Error::InvalidCertificates.to_string(),
            "certificates must be exactly two"
        );
        assert_eq!(Error::InvalidHeader.to_string(), "invalid header");
        assert_eq!(Error::WrongPacketType.to_string(), "wrong packet type");
        assert_eq!(
            Error::PacketSizeExceed.to_string(),
            "codec: packet size exceed"
        );
        assert_eq!(
            Error::ReceivedMsgSmallerThanExpected.to_string(),
            "received less data than expected, EOF"
        );
        assert_eq!(
            Error::ReceivedMsgBiggerThanExpected.to_string(),
            "received more data than expected"
        );
        assert_eq!(
            Error::ConnectionClosed.to_string(),
            "client connection closed"
        );
    }
}
