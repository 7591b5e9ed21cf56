//! # Transport Abstraction
//!
//! A minimal, async interface for moving whole messages between a client and
//! a component host.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The transport knows nothing about headers, correlation
//!   ids or values. It moves opaque, already framed messages.
//! - **Duplex**: Sends and receives are independent. Responses can arrive in any
//!   order and interleave with announcements the host sends unprompted.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer is unreachable or the connection was dropped.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// The peer rejected the message size.
    #[error("message too large for transport")]
    PayloadTooLarge,
    /// Generic I/O error or internal transport failure.
    #[error("i/o error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// This trait is object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one complete message.
    async fn send(&self, message: &[u8]) -> Result<()>;

    /// Receives the next complete message.
    ///
    /// `Ok(None)` means the peer closed the stream cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>>;
}
