//! # Invocations
//!
//! `InvocationContext` carries one call from the dispatcher to the receiver.
//! `Outcome` is what the dispatcher hands back: a value, a pending future, or
//! nothing at all for fire-and-forget calls.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use remorpc::Attachments;

use crate::correlation::CorrelationId;
use crate::correlation::PendingSlot;
use crate::error::InvocationError;
use crate::interceptor;
use crate::interceptor::ClientInterceptor;
use crate::locator::Locator;
use crate::method::Method;
use crate::receiver::Receiver;
use crate::receiver::ReceiverContext;
use crate::registry::ReceiverId;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultState {
    Pending,
    Ready,
    /// Nobody will read the result.
    Discarded,
}

#[derive(Debug)]
pub struct InvocationContext {
    locator: Arc<Locator>,
    method: Method,
    arguments: Option<Vec<Value>>,
    receiver: ReceiverId,
    attachments: Attachments,
    correlation_id: Option<CorrelationId>,
    state: ResultState,
}

impl InvocationContext {
    pub fn new(locator: Arc<Locator>, method: Method, arguments: Vec<Value>, receiver: ReceiverId) -> Self {
        Self {
            locator,
            method,
            arguments: Some(arguments),
            receiver,
            attachments: Attachments::new(),
            correlation_id: None,
            state: ResultState::Pending,
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// `None` once the receiver took the arguments to encode them.
    pub fn arguments(&self) -> Option<&[Value]> {
        self.arguments.as_deref()
    }

    /// Moves the arguments out; the context stops holding them.
    pub fn take_arguments(&mut self) -> Vec<Value> {
        self.arguments.take().unwrap_or_default()
    }

    pub fn receiver_id(&self) -> ReceiverId {
        self.receiver
    }

    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut Attachments {
        &mut self.attachments
    }

    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }

    pub fn set_correlation_id(&mut self, id: CorrelationId) {
        self.correlation_id = Some(id);
    }

    pub fn state(&self) -> ResultState {
        self.state
    }

    pub(crate) fn mark_ready(&mut self) {
        self.state = ResultState::Ready;
    }

    pub(crate) fn mark_discarded(&mut self) {
        self.state = ResultState::Discarded;
    }
}

/// The result of dispatching one call.
#[derive(Debug)]
pub enum Outcome {
    Value(Value),
    Pending(InvocationFuture),
    /// Fire-and-forget; the result will be dropped on arrival.
    Discarded,
}

impl Outcome {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_future(self) -> Option<InvocationFuture> {
        match self {
            Self::Pending(f) => Some(f),
            _ => None,
        }
    }
}

/// A result that will arrive later.
pub struct InvocationFuture {
    slot: PendingSlot,
    invocation: InvocationContext,
    interceptors: Vec<Arc<dyn ClientInterceptor>>,
    receiver: Arc<dyn Receiver>,
    context: ReceiverContext,
    timeout: Duration,
}

impl InvocationFuture {
    pub(crate) fn new(
        slot: PendingSlot,
        invocation: InvocationContext,
        interceptors: Vec<Arc<dyn ClientInterceptor>>,
        receiver: Arc<dyn Receiver>,
        context: ReceiverContext,
        timeout: Duration,
    ) -> Self {
        Self { slot, invocation, interceptors, receiver, context, timeout }
    }

    /// The invocation this future completes.
    pub fn invocation(&self) -> &InvocationContext {
        &self.invocation
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.slot.id()
    }

    /// Waits for and decodes the result, using the configured timeout.
    ///
    /// The result can be claimed once; later calls fail.
    pub async fn get(&mut self) -> Result<Value, InvocationError> {
        self.get_timeout(self.timeout).await
    }

    pub async fn get_timeout(&mut self, timeout: Duration) -> Result<Value, InvocationError> {
        let producer = self.slot.wait(timeout).await?;
        self.invocation.mark_ready();
        interceptor::after_result(&self.interceptors, &self.invocation, producer.get_result())
    }

    /// Best-effort cancellation.
    ///
    /// True only when the receiver confirmed the call never ran remotely; the
    /// local slot is then withdrawn and `get` reports the cancellation.
    pub fn cancel(&mut self) -> bool {
        let confirmed = self.receiver.cancel_invocation(&self.context, self.slot.id());
        if confirmed {
            self.slot.cancel();
        }
        confirmed
    }
}

impl fmt::Debug for InvocationFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationFuture")
            .field("correlation_id", &self.slot.id())
            .field("receiver", &self.receiver.name())
            .finish()
    }
}
