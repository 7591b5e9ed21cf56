//! Answers to transaction messages.
//!
//! The optional value is surfaced as `Value::Long`; a missing value as
//! `Value::Unit`.

use remopack::Reader;
use remorpc::TxResponse;

use crate::error::InvocationError;
use crate::producer::ResultProducer;
use crate::producer::finish;
use crate::producer::release;
use crate::protocol::ProtocolMessageHandler;
use crate::protocol::read_invocation_id;
use crate::remoting::ChannelAssociation;
use crate::stream::InputGuard;
use crate::value::Value;

pub struct TransactionResponseHandler;

impl ProtocolMessageHandler for TransactionResponseHandler {
    fn process_message(&self, association: &ChannelAssociation, mut input: InputGuard) -> Result<(), InvocationError> {
        let invocation_id = read_invocation_id(&mut input)?;
        association.result_ready(invocation_id, Box::new(TxOutcomeProducer { input }));
        Ok(())
    }
}

struct TxOutcomeProducer {
    input: InputGuard,
}

impl ResultProducer for TxOutcomeProducer {
    fn get_result(self: Box<Self>) -> Result<Value, InvocationError> {
        let Self { mut input } = *self;
        let decoded = {
            let mut r = Reader::new(&mut input);
            TxResponse::read_tail(&mut r)
                .map(|value| value.map_or(Value::Unit, |v| Value::Long(i64::from(v))))
                .map_err(InvocationError::from)
        };
        finish(input, decoded)
    }

    fn discard_result(self: Box<Self>) {
        release(self.input);
    }
}
