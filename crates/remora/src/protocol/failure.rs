//! Failed invocations: application exceptions and the refusals a host sends
//! when it cannot route a call (no such component, no such method, session
//! gone, target not stateful).

use remopack::Reader;
use remorpc::FailureKind;
use remorpc::InvocationFailure;

use crate::error::InvocationError;
use crate::producer::ResultProducer;
use crate::producer::finish;
use crate::producer::release;
use crate::protocol::ProtocolMessageHandler;
use crate::protocol::read_invocation_id;
use crate::remoting::ChannelAssociation;
use crate::stream::InputGuard;
use crate::value::Value;

pub struct InvocationFailureHandler {
    kind: FailureKind,
}

impl InvocationFailureHandler {
    pub fn new(kind: FailureKind) -> Self {
        Self { kind }
    }
}

impl ProtocolMessageHandler for InvocationFailureHandler {
    fn process_message(&self, association: &ChannelAssociation, mut input: InputGuard) -> Result<(), InvocationError> {
        let invocation_id = read_invocation_id(&mut input)?;
        association.result_ready(invocation_id, Box::new(FailureResultProducer { input, kind: self.kind }));
        Ok(())
    }
}

struct FailureResultProducer {
    input: InputGuard,
    kind: FailureKind,
}

impl ResultProducer for FailureResultProducer {
    fn get_result(self: Box<Self>) -> Result<Value, InvocationError> {
        let Self { mut input, kind } = *self;
        let decoded = read_message(&mut input, kind)
            .and_then(|message| Err(InvocationError::Remote { kind, message }));
        finish(input, decoded)
    }

    fn discard_result(self: Box<Self>) {
        release(self.input);
    }
}

fn read_message(input: &mut InputGuard, kind: FailureKind) -> Result<String, InvocationError> {
    let mut r = Reader::new(input);
    let (message, _attachments) = InvocationFailure::read_tail(kind, &mut r)?;
    Ok(message)
}
