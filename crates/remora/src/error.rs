//! # Error Definitions
//!
//! `InvocationError` is what a caller sees. Resolution failures surface before
//! anything is sent; everything after the send reaches the caller through the
//! correlation slot, either directly or through an `InvocationFuture`.

use remorpc::FailureKind;

use crate::codec::CodecError;
use crate::correlation::CorrelationError;
use crate::correlation::CorrelationId;
use crate::handler::SerializationError;
use crate::module_id::IdentityError;
use crate::module_id::ModuleId;
use crate::transaction::XaError;
use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("no client context is active on this task")]
    NoClientContext,
    #[error("no receiver accepts module {0}")]
    NoSuchReceiver(ModuleId),
    #[error("receiver {0} is not registered with this client context")]
    UnknownReceiver(crate::registry::ReceiverId),
    /// A locally handled method could not be answered for this proxy.
    #[error("{0}")]
    RemoteInvocation(String),
    /// The host reported a failure for this invocation.
    #[error("remote {kind:?}: {message}")]
    Remote { kind: FailureKind, message: String },
    #[error("invocation {0} timed out")]
    Timeout(CorrelationId),
    #[error("invocation {0} was cancelled")]
    Cancelled(CorrelationId),
    #[error("channel closed: {0}")]
    ChannelClosed(String),
    #[error(transparent)]
    Correlation(#[from] CorrelationError),
    #[error("protocol error: {0}")]
    Protocol(#[from] remorpc::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Transaction(#[from] XaError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error("failed to close message input: {0}")]
    Close(#[source] std::io::Error),
    #[error("expected {expected} result, got {}", .found.type_name())]
    UnexpectedResult { expected: &'static str, found: Value },
}

impl From<remopack::Error> for InvocationError {
    fn from(e: remopack::Error) -> Self {
        Self::Protocol(remorpc::Error::Pack(e))
    }
}

pub type Result<T> = std::result::Result<T, InvocationError>;
