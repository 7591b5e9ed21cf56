//! # Error Definitions
//!
//! Failures while building or reading protocol messages.

/// Protocol-level failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying framing failed (truncated input, bad length, bad UTF-8).
    #[error("framing error: {0}")]
    Pack(#[from] remopack::Error),
    /// The header byte does not name any known message.
    #[error("unknown message header {0:#04x}")]
    UnknownHeader(u8),
    /// A known header arrived where a different message was required.
    #[error("expected {expected:?} header, found {found:?}")]
    UnexpectedHeader {
        expected: crate::MessageHeader,
        found: crate::MessageHeader,
    },
    /// The message is well framed but its contents break the protocol.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

/// A specialized Result type for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;
