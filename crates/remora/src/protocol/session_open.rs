//! Session-open responses.
//!
//! `[InvocationId: u16][Len: packed][SessionId: Len][Attachments]`
//!
//! The handler reads the id and nothing else. The session id and attachment
//! block stay in the stream until the waiting caller asks for the result.

use remopack::Reader;
use remorpc::SessionOpenResponse;
use tracing::trace;

use crate::error::InvocationError;
use crate::producer::ResultProducer;
use crate::producer::finish;
use crate::producer::release;
use crate::protocol::ProtocolMessageHandler;
use crate::protocol::read_invocation_id;
use crate::remoting::ChannelAssociation;
use crate::stream::InputGuard;
use crate::value::Value;

pub struct SessionOpenResponseHandler;

impl ProtocolMessageHandler for SessionOpenResponseHandler {
    fn process_message(&self, association: &ChannelAssociation, mut input: InputGuard) -> Result<(), InvocationError> {
        let invocation_id = read_invocation_id(&mut input)?;
        association.result_ready(invocation_id, Box::new(SessionIdResultProducer { input }));
        Ok(())
    }
}

/// Decodes the session id of a session-open response on demand.
pub struct SessionIdResultProducer {
    input: InputGuard,
}

impl SessionIdResultProducer {
    pub fn new(input: InputGuard) -> Self {
        Self { input }
    }
}

impl ResultProducer for SessionIdResultProducer {
    fn get_result(self: Box<Self>) -> Result<Value, InvocationError> {
        let Self { mut input } = *self;
        let decoded = read_session(&mut input);
        finish(input, decoded)
    }

    fn discard_result(self: Box<Self>) {
        release(self.input);
    }
}

fn read_session(input: &mut InputGuard) -> Result<Value, InvocationError> {
    let mut r = Reader::new(input);
    let (session, attachments) = SessionOpenResponse::read_tail(&mut r)?;
    trace!(session = %session, attachments = attachments.len(), "Decoded session id");
    Ok(Value::Session(session))
}
