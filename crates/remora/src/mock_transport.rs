//! In-memory transports for tests and local wiring.
//!
//! Each send carries exactly one whole encoded `remorpc` message, so a
//! scripted host on the far end can `Message::decode` what it receives and
//! answer with hand-built responses. Dropping one end makes the other end's
//! `recv()` return `None`, which a `RemotingReceiver` treats as channel loss.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::transport;
use crate::transport::Transport;
use crate::transport::TransportError;

/// A duplex channel transport using tokio mpsc channels.
///
/// Messages sent on one end appear on the other end's `recv()`.
pub struct DuplexChannelTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl DuplexChannelTransport {
    /// Creates a pair of transports connected to each other.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();

        let a = Self { tx: tx_a, rx: Arc::new(Mutex::new(rx_b)) };
        let b = Self { tx: tx_b, rx: Arc::new(Mutex::new(rx_a)) };

        (a, b)
    }
}

#[async_trait::async_trait]
impl Transport for DuplexChannelTransport {
    async fn send(&self, message: &[u8]) -> transport::Result<()> {
        self.tx
            .send(message.to_vec())
            .map_err(|_| TransportError::ConnectionLost("channel closed".into()))
    }

    async fn recv(&self) -> transport::Result<Option<Vec<u8>>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }
}
