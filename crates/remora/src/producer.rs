//! # Result Producers
//!
//! A result producer is a single-use, deferred decoder. Protocol handlers build
//! one per response after reading only the invocation id; the consumer that
//! claims the correlation slot decides whether to decode (`get_result`) or drop
//! (`discard_result`) the rest.
//!
//! ## Invariants
//! - Both terminal operations consume the producer, so neither can run twice.
//! - The backing stream is closed on every path. A failure to close never hides
//!   a decode failure; it only surfaces when decoding itself succeeded.

use tracing::warn;

use crate::error::InvocationError;
use crate::stream::InputGuard;
use crate::value::Value;

pub trait ResultProducer: Send {
    /// Decodes the result, releasing the stream.
    fn get_result(self: Box<Self>) -> Result<Value, InvocationError>;

    /// Drops the result unread, releasing the stream.
    fn discard_result(self: Box<Self>);
}

/// A result that is already decoded.
pub struct ValueProducer(pub Value);

impl ResultProducer for ValueProducer {
    fn get_result(self: Box<Self>) -> Result<Value, InvocationError> {
        Ok(self.0)
    }

    fn discard_result(self: Box<Self>) {}
}

/// A failure that is already known.
pub struct FailureProducer(pub InvocationError);

impl ResultProducer for FailureProducer {
    fn get_result(self: Box<Self>) -> Result<Value, InvocationError> {
        Err(self.0)
    }

    fn discard_result(self: Box<Self>) {}
}

/// Closes `input` and merges the outcome of closing with the outcome of decoding.
pub fn finish<T>(mut input: InputGuard, decoded: Result<T, InvocationError>) -> Result<T, InvocationError> {
    let closed = input.close();
    match (decoded, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(InvocationError::Close(e)),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close)) => {
            warn!(error = %close, decode_error = %e, "Failed to close message input after decode failure");
            Err(e)
        }
    }
}

/// Releases `input` for a discarded result, logging a failed close.
pub fn release(mut input: InputGuard) {
    if let Err(e) = input.close() {
        warn!(error = %e, "Failed to close discarded message input");
    }
}
