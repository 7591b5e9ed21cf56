//! # Protocol Message Handlers
//!
//! One handler per inbound message kind. The association reads the header
//! byte and hands the rest of the message to the matching handler.
//!
//! ## Invariants
//! - Handlers read only what they need to route the message, normally the
//!   2-byte invocation id. Everything after it is decoded by a `ResultProducer`
//!   when, and only if, the consumer asks for the result.
//! - Whoever ends up owning the `InputGuard` releases it; a handler that fails
//!   early drops it, which closes the stream.

use std::collections::HashMap;
use std::sync::Arc;

use remopack::Reader;
use remorpc::FailureKind;
use remorpc::MessageHeader;

use crate::codec::ValueCodec;
use crate::correlation::CorrelationId;
use crate::error::InvocationError;
use crate::remoting::ChannelAssociation;
use crate::stream::InputGuard;

pub mod failure;
pub mod invocation_response;
pub mod notification;
pub mod session_open;
pub mod tx_response;

pub use failure::InvocationFailureHandler;
pub use invocation_response::InvocationResponseHandler;
pub use notification::AsyncMethodNotificationHandler;
pub use notification::ModuleAvailabilityHandler;
pub use session_open::SessionOpenResponseHandler;
pub use tx_response::TransactionResponseHandler;

pub trait ProtocolMessageHandler: Send + Sync {
    /// Processes one message whose header byte was already consumed.
    fn process_message(&self, association: &ChannelAssociation, input: InputGuard) -> Result<(), InvocationError>;
}

pub(crate) fn read_invocation_id(input: &mut InputGuard) -> Result<CorrelationId, InvocationError> {
    let mut r = Reader::new(input);
    Ok(remorpc::read_invocation_id(&mut r)?)
}

/// Handlers for every message a host may send to a client.
pub fn default_handlers(codec: Arc<dyn ValueCodec>) -> HashMap<MessageHeader, Box<dyn ProtocolMessageHandler>> {
    let mut handlers: HashMap<MessageHeader, Box<dyn ProtocolMessageHandler>> = HashMap::new();
    handlers.insert(MessageHeader::SessionOpenResponse, Box::new(SessionOpenResponseHandler));
    handlers.insert(MessageHeader::InvocationResponse, Box::new(InvocationResponseHandler::new(codec)));
    for kind in [
        FailureKind::ApplicationException,
        FailureKind::NoSuchComponent,
        FailureKind::NoSuchMethod,
        FailureKind::SessionNotActive,
        FailureKind::NotStateful,
    ] {
        handlers.insert(kind.header(), Box::new(InvocationFailureHandler::new(kind)));
    }
    handlers.insert(MessageHeader::ModuleAvailable, Box::new(ModuleAvailabilityHandler::new(true)));
    handlers.insert(MessageHeader::ModuleUnavailable, Box::new(ModuleAvailabilityHandler::new(false)));
    handlers.insert(MessageHeader::AsyncMethodNotification, Box::new(AsyncMethodNotificationHandler));
    handlers.insert(MessageHeader::TxResponse, Box::new(TransactionResponseHandler));
    handlers
}
