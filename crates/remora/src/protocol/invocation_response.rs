//! Successful invocation results.

use std::sync::Arc;

use remopack::Reader;
use remorpc::InvocationResponse;

use crate::codec::ValueCodec;
use crate::error::InvocationError;
use crate::producer::ResultProducer;
use crate::producer::finish;
use crate::producer::release;
use crate::protocol::ProtocolMessageHandler;
use crate::protocol::read_invocation_id;
use crate::remoting::ChannelAssociation;
use crate::stream::InputGuard;
use crate::value::Value;

pub struct InvocationResponseHandler {
    codec: Arc<dyn ValueCodec>,
}

impl InvocationResponseHandler {
    pub fn new(codec: Arc<dyn ValueCodec>) -> Self {
        Self { codec }
    }
}

impl ProtocolMessageHandler for InvocationResponseHandler {
    fn process_message(&self, association: &ChannelAssociation, mut input: InputGuard) -> Result<(), InvocationError> {
        let invocation_id = read_invocation_id(&mut input)?;
        let producer = MethodResultProducer { input, codec: self.codec.clone() };
        association.result_ready(invocation_id, Box::new(producer));
        Ok(())
    }
}

/// Reads the payload blob and decodes it with the channel's codec.
struct MethodResultProducer {
    input: InputGuard,
    codec: Arc<dyn ValueCodec>,
}

impl ResultProducer for MethodResultProducer {
    fn get_result(self: Box<Self>) -> Result<Value, InvocationError> {
        let Self { mut input, codec } = *self;
        let decoded = read_payload(&mut input).and_then(|payload| Ok(codec.decode_result(&payload)?));
        finish(input, decoded)
    }

    fn discard_result(self: Box<Self>) {
        release(self.input);
    }
}

fn read_payload(input: &mut InputGuard) -> Result<Vec<u8>, InvocationError> {
    let mut r = Reader::new(input);
    let (payload, _attachments) = InvocationResponse::read_tail(&mut r)?;
    Ok(payload)
}
