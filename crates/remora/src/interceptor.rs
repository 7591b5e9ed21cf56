//! # Client Interceptors
//!
//! Receiver-specific hooks wrapped around every invocation the receiver
//! services. A receiver lists its interceptors through
//! `Receiver::client_interceptors`; the list is empty by default.
//!
//! ## Ordering
//!
//! `handle_invocation` runs in list order, after the receiver-specific
//! attachments were merged and before `process_invocation`. `handle_result`
//! runs in reverse order once a result was claimed, whether it is claimed by a
//! synchronous wait or later through an `InvocationFuture`.
//!
//! Fire-and-forget calls never reach `handle_result`.

use std::sync::Arc;

use crate::error::InvocationError;
use crate::invocation::InvocationContext;
use crate::value::Value;

pub trait ClientInterceptor: Send + Sync {
    /// Inspects or adjusts the invocation before it is sent.
    ///
    /// An error stops the call; nothing is sent.
    fn handle_invocation(&self, _invocation: &mut InvocationContext) -> Result<(), InvocationError> {
        Ok(())
    }

    /// Sees the decoded result and may replace it.
    fn handle_result(
        &self,
        _invocation: &InvocationContext,
        result: Result<Value, InvocationError>,
    ) -> Result<Value, InvocationError> {
        result
    }
}

pub(crate) fn before_send(
    interceptors: &[Arc<dyn ClientInterceptor>],
    invocation: &mut InvocationContext,
) -> Result<(), InvocationError> {
    interceptors.iter().try_for_each(|i| i.handle_invocation(invocation))
}

pub(crate) fn after_result(
    interceptors: &[Arc<dyn ClientInterceptor>],
    invocation: &InvocationContext,
    result: Result<Value, InvocationError>,
) -> Result<Value, InvocationError> {
    interceptors.iter().rev().fold(result, |result, i| i.handle_result(invocation, result))
}
