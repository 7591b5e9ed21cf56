//! # Channel Association
//!
//! The inbound half of a remoting channel: routes each message to its
//! protocol handler and owns the channel's correlation table.
//!
//! Module announcements can arrive before the receiver is associated with a
//! client context. They are kept in order and replayed on association.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use remopack::Reader;
use remorpc::MessageHeader;
use remorpc::ModuleAvailability;
use tracing::debug;
use tracing::warn;

use crate::codec::ValueCodec;
use crate::correlation::CorrelationId;
use crate::correlation::CorrelationTable;
use crate::error::InvocationError;
use crate::module_id::ModuleId;
use crate::producer::ResultProducer;
use crate::protocol::ProtocolMessageHandler;
use crate::protocol::default_handlers;
use crate::receiver::ReceiverContext;
use crate::stream::InputGuard;
use crate::stream::MessageInput;

#[derive(Default)]
struct AssociationState {
    context: Option<ReceiverContext>,
    backlog: Vec<ModuleAvailability>,
}

pub struct ChannelAssociation {
    name: String,
    table: Arc<CorrelationTable>,
    handlers: HashMap<MessageHeader, Box<dyn ProtocolMessageHandler>>,
    state: Mutex<AssociationState>,
    closed: AtomicBool,
}

impl ChannelAssociation {
    pub fn new(name: impl Into<String>, table: Arc<CorrelationTable>, codec: Arc<dyn ValueCodec>) -> Self {
        Self {
            name: name.into(),
            table,
            handlers: default_handlers(codec),
            state: Mutex::new(AssociationState::default()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &Arc<CorrelationTable> {
        &self.table
    }

    /// Routes one inbound message to its handler.
    pub fn process_message(&self, input: Box<dyn MessageInput>) -> Result<(), InvocationError> {
        let mut input = InputGuard::new(input);
        let header = MessageHeader::read(&mut Reader::new(&mut input))?;
        let Some(handler) = self.handlers.get(&header) else {
            return Err(InvocationError::Protocol(remorpc::Error::ProtocolViolation(format!(
                "{:?} is not a message a host sends",
                header
            ))));
        };
        handler.process_message(self, input)
    }

    pub fn result_ready(&self, invocation_id: CorrelationId, producer: Box<dyn ResultProducer>) -> bool {
        self.table.fulfill(invocation_id, producer)
    }

    pub fn proceed_async(&self, invocation_id: CorrelationId) -> bool {
        self.table.proceed_async(invocation_id)
    }

    /// Binds the channel to a client context and replays early announcements.
    pub fn associate(&self, context: ReceiverContext) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let backlog = std::mem::take(&mut state.backlog);
        debug!(channel = %self.name, receiver = %context.id(), replayed = backlog.len(), "Channel associated");
        for announcement in &backlog {
            Self::apply(&context, announcement);
        }
        state.context = Some(context);
    }

    pub fn receiver_context(&self) -> Option<ReceiverContext> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).context.clone()
    }

    /// Applies a module announcement, or keeps it until association.
    pub fn modules_changed(&self, announcement: ModuleAvailability) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &state.context {
            Some(context) => Self::apply(context, &announcement),
            None => state.backlog.push(announcement),
        }
    }

    fn apply(context: &ReceiverContext, announcement: &ModuleAvailability) {
        for triple in &announcement.modules {
            let module = match ModuleId::from_triple(triple) {
                Ok(module) => module,
                Err(e) => {
                    warn!(error = %e, ?triple, "Ignoring malformed module announcement");
                    continue;
                }
            };
            match announcement.available {
                true => context.register(module),
                false => context.deregister(&module),
            };
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Marks the channel dead and fails everything still waiting on it.
    pub fn close(&self, reason: &str) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        self.table.fail_all(reason)
    }
}

impl fmt::Debug for ChannelAssociation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelAssociation")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("closed", &self.is_closed())
            .finish()
    }
}
