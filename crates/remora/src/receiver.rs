//! # Receivers
//!
//! A receiver is the client-side representative of one remote endpoint. It
//! announces the modules it can service through its `ReceiverContext`, turns
//! invocations into requests, and implements the transaction bridge for its
//! endpoint.
//!
//! ## Lifecycle
//!
//! 1. `ClientContext::register_receiver` assigns an id and calls `associate`.
//! 2. The receiver registers modules whenever its endpoint announces them.
//! 3. `ClientContext::unregister_receiver` disassociates it; every module it
//!    announced is withdrawn at once.

use std::sync::Arc;

use async_trait::async_trait;
use remorpc::Attachments;
use remorpc::SessionId;

use crate::correlation::CorrelationId;
use crate::correlation::PendingSlot;
use crate::error::InvocationError;
use crate::interceptor::ClientInterceptor;
use crate::invocation::InvocationContext;
use crate::module_id::IdentityError;
use crate::module_id::ModuleId;
use crate::registry::ReceiverId;
use crate::registry::ReceiverRegistry;
use crate::transaction::TransactionBridge;

#[async_trait]
pub trait Receiver: TransactionBridge + Send + Sync + 'static {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Called once when the receiver joins a client context.
    fn associate(&self, context: ReceiverContext);

    /// Registers a correlation slot and queues the request for `invocation`.
    ///
    /// Must not wait for the network: the returned slot completes later.
    async fn process_invocation(
        &self,
        invocation: &mut InvocationContext,
        context: &ReceiverContext,
    ) -> Result<PendingSlot, InvocationError>;

    /// Asks the endpoint to abandon an invocation.
    ///
    /// Returns true only if the endpoint confirmed the invocation never ran.
    fn cancel_invocation(&self, _context: &ReceiverContext, _correlation_id: CorrelationId) -> bool {
        false
    }

    /// Opens a session on a stateful bean and returns its id.
    async fn open_session(
        &self,
        context: &ReceiverContext,
        module: &ModuleId,
        bean: &str,
    ) -> Result<SessionId, InvocationError>;

    /// Checks that the endpoint can service `bean` in `module`.
    async fn verify(&self, module: &ModuleId, bean: &str) -> Result<(), InvocationError>;

    /// Attachments this receiver adds to every invocation it services.
    fn create_receiver_specific(&self) -> Attachments {
        Attachments::new()
    }

    /// Interceptors wrapped around every invocation this receiver services.
    fn client_interceptors(&self) -> Vec<Arc<dyn ClientInterceptor>> {
        Vec::new()
    }
}

/// A receiver's view of the client context it belongs to.
#[derive(Debug, Clone)]
pub struct ReceiverContext {
    id: ReceiverId,
    registry: Arc<ReceiverRegistry>,
}

impl ReceiverContext {
    pub(crate) fn new(id: ReceiverId, registry: Arc<ReceiverRegistry>) -> Self {
        Self { id, registry }
    }

    pub fn id(&self) -> ReceiverId {
        self.id
    }

    /// False once the receiver was disassociated.
    pub fn is_associated(&self) -> bool {
        self.registry.contains_receiver(self.id)
    }

    /// Returns true if the module was previously unknown for this receiver.
    pub fn register_module(
        &self,
        app_name: Option<&str>,
        module_name: &str,
        distinct_name: Option<&str>,
    ) -> Result<bool, IdentityError> {
        let module = ModuleId::new(app_name, module_name, distinct_name)?;
        Ok(self.registry.register(self.id, module))
    }

    /// Returns true if the module was registered.
    pub fn deregister_module(
        &self,
        app_name: Option<&str>,
        module_name: &str,
        distinct_name: Option<&str>,
    ) -> Result<bool, IdentityError> {
        let module = ModuleId::new(app_name, module_name, distinct_name)?;
        Ok(self.registry.deregister(self.id, &module))
    }

    pub fn accepts_module(
        &self,
        app_name: Option<&str>,
        module_name: &str,
        distinct_name: Option<&str>,
    ) -> Result<bool, IdentityError> {
        let module = ModuleId::new(app_name, module_name, distinct_name)?;
        Ok(self.registry.accepts(self.id, &module))
    }

    pub fn register(&self, module: ModuleId) -> bool {
        self.registry.register(self.id, module)
    }

    pub fn deregister(&self, module: &ModuleId) -> bool {
        self.registry.deregister(self.id, module)
    }

    pub fn accepts(&self, module: &ModuleId) -> bool {
        self.registry.accepts(self.id, module)
    }
}
