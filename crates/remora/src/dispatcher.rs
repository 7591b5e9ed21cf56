//! # Invocation Dispatcher
//!
//! Turns a proxy call into exactly one `Outcome`.
//!
//! ## Steps
//!
//! 1. Locally handled methods are answered on the spot.
//! 2. The current client context picks a receiver for the target module.
//!    Missing context or receiver fails the call before anything is sent.
//! 3. The receiver's client interceptors see the invocation, then the receiver
//!    registers a correlation slot and queues the request.
//! 4. Synchronous calls wait on the slot. If the host asks the caller to
//!    proceed asynchronously, or the call was asynchronous to begin with, the
//!    call resolves as `Pending` (a future) or, for methods without a result,
//!    as `Discarded`.
//! 5. Claimed results pass back through the interceptors in reverse order.

use tracing::debug;

use crate::context::ClientContext;
use crate::correlation::Completion;
use crate::error::InvocationError;
use crate::handler::InvocationMode;
use crate::interceptor;
use crate::invocation::InvocationContext;
use crate::invocation::InvocationFuture;
use crate::invocation::Outcome;
use crate::local_methods;
use crate::method::Method;
use crate::method::ReturnType;
use crate::proxy::Proxy;
use crate::value::Value;

/// Dispatches in the proxy's own mode.
pub async fn dispatch(proxy: &Proxy, method: &Method, args: Vec<Value>) -> Result<Outcome, InvocationError> {
    dispatch_with_mode(proxy, method, args, proxy.handler().mode()).await
}

pub async fn dispatch_with_mode(
    proxy: &Proxy,
    method: &Method,
    args: Vec<Value>,
    mode: InvocationMode,
) -> Result<Outcome, InvocationError> {
    if let Some(result) = local_methods::try_handle(proxy, method, &args) {
        return result.map(Outcome::Value);
    }

    let client = ClientContext::require_current()?;
    let locator = proxy.locator_arc().clone();
    let (receiver, receiver_context) = client.require_receiver(locator.module())?;

    let mut invocation = InvocationContext::new(locator, method.clone(), args, receiver_context.id());
    invocation.attachments_mut().merge(&receiver.create_receiver_specific());
    let interceptors = receiver.client_interceptors();
    interceptor::before_send(&interceptors, &mut invocation)?;

    let mut slot = receiver.process_invocation(&mut invocation, &receiver_context).await?;
    debug!(
        correlation_id = slot.id(),
        receiver = %receiver_context.id(),
        method = %method,
        ?mode,
        "Invocation sent"
    );

    let timeout = client.config().invocation_timeout;

    if mode == InvocationMode::Sync {
        match slot.wait_or_proceed(timeout).await? {
            Completion::Ready(producer) => {
                invocation.mark_ready();
                let result = interceptor::after_result(&interceptors, &invocation, producer.get_result());
                return result.map(Outcome::Value);
            }
            Completion::ProceedAsync => {
                debug!(correlation_id = slot.id(), "Host requested asynchronous completion");
            }
        }
    }

    let outcome = match method.returns() {
        ReturnType::Unit => {
            invocation.mark_discarded();
            slot.discard();
            Outcome::Discarded
        }
        ReturnType::Future | ReturnType::Value => Outcome::Pending(InvocationFuture::new(
            slot,
            invocation,
            interceptors,
            receiver,
            receiver_context,
            timeout,
        )),
    };
    Ok(outcome)
}
