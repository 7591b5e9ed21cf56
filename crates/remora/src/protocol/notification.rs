//! Messages the host sends unprompted or out of band: module announcements
//! and proceed-asynchronously signals. Both are small and decoded eagerly.

use remopack::Reader;
use remorpc::ModuleAvailability;

use crate::error::InvocationError;
use crate::producer::finish;
use crate::protocol::ProtocolMessageHandler;
use crate::protocol::read_invocation_id;
use crate::remoting::ChannelAssociation;
use crate::stream::InputGuard;

pub struct ModuleAvailabilityHandler {
    available: bool,
}

impl ModuleAvailabilityHandler {
    pub fn new(available: bool) -> Self {
        Self { available }
    }
}

impl ProtocolMessageHandler for ModuleAvailabilityHandler {
    fn process_message(&self, association: &ChannelAssociation, mut input: InputGuard) -> Result<(), InvocationError> {
        let decoded = {
            let mut r = Reader::new(&mut input);
            ModuleAvailability::decode_body(self.available, &mut r).map_err(InvocationError::from)
        };
        let announcement = finish(input, decoded)?;
        association.modules_changed(announcement);
        Ok(())
    }
}

pub struct AsyncMethodNotificationHandler;

impl ProtocolMessageHandler for AsyncMethodNotificationHandler {
    fn process_message(&self, association: &ChannelAssociation, mut input: InputGuard) -> Result<(), InvocationError> {
        let decoded = read_invocation_id(&mut input);
        let invocation_id = finish(input, decoded)?;
        association.proceed_async(invocation_id);
        Ok(())
    }
}
