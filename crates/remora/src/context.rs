//! # Client Context
//!
//! The set of receivers a client can reach, and the lookup that picks one for
//! a module.
//!
//! A context becomes *current* for the duration of `ClientContext::scope`.
//! Dispatch only ever consults the current context, so one process can run
//! several independent clients side by side on different tasks.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::InvocationError;
use crate::locator::Locator;
use crate::module_id::ModuleId;
use crate::receiver::Receiver;
use crate::receiver::ReceiverContext;
use crate::registry::ReceiverId;
use crate::registry::ReceiverRegistry;
use crate::transaction::TransactionResource;

tokio::task_local! {
    static CURRENT: Arc<ClientContext>;
}

struct Registered {
    receiver: Arc<dyn Receiver>,
    context: ReceiverContext,
}

pub struct ClientContext {
    config: ClientConfig,
    registry: Arc<ReceiverRegistry>,
    receivers: DashMap<ReceiverId, Registered>,
    id_gen: AtomicU64,
}

impl ClientContext {
    pub fn new(config: ClientConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: Arc::new(ReceiverRegistry::new()),
            receivers: DashMap::new(),
            id_gen: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ReceiverRegistry> {
        &self.registry
    }

    /// Runs `fut` with this context as the current one.
    pub async fn scope<F: Future>(self: Arc<Self>, fut: F) -> F::Output {
        CURRENT.scope(self, fut).await
    }

    pub fn current() -> Option<Arc<ClientContext>> {
        CURRENT.try_with(|ctx| ctx.clone()).ok()
    }

    pub fn require_current() -> Result<Arc<ClientContext>, InvocationError> {
        Self::current().ok_or(InvocationError::NoClientContext)
    }

    /// Adds a receiver and associates it with this context.
    pub fn register_receiver(&self, receiver: Arc<dyn Receiver>) -> ReceiverId {
        let id = ReceiverId(self.id_gen.fetch_add(1, Ordering::Relaxed));
        self.registry.add_receiver(id);
        let context = ReceiverContext::new(id, self.registry.clone());
        self.receivers.insert(id, Registered { receiver: receiver.clone(), context: context.clone() });
        debug!(receiver = %id, name = receiver.name(), "Receiver associated");
        receiver.associate(context);
        id
    }

    /// Disassociates a receiver, withdrawing every module it announced.
    pub fn unregister_receiver(&self, id: ReceiverId) -> bool {
        let removed = self.receivers.remove(&id).is_some();
        self.registry.remove_receiver(id);
        if removed {
            debug!(receiver = %id, "Receiver disassociated");
        }
        removed
    }

    pub fn receiver(&self, id: ReceiverId) -> Result<(Arc<dyn Receiver>, ReceiverContext), InvocationError> {
        self.receivers
            .get(&id)
            .map(|r| (r.receiver.clone(), r.context.clone()))
            .ok_or(InvocationError::UnknownReceiver(id))
    }

    /// Picks the receiver for `module`: the earliest registered one accepting it.
    pub fn require_receiver(
        &self,
        module: &ModuleId,
    ) -> Result<(Arc<dyn Receiver>, ReceiverContext), InvocationError> {
        self.registry
            .receivers_accepting(module)
            .into_iter()
            .find_map(|id| self.receiver(id).ok())
            .ok_or_else(|| InvocationError::NoSuchReceiver(module.clone()))
    }

    /// Opens a session on a stateful bean and returns a locator bound to it.
    pub async fn create_session(
        &self,
        module: &ModuleId,
        bean: &str,
        view: &str,
    ) -> Result<Locator, InvocationError> {
        let (receiver, context) = self.require_receiver(module)?;
        receiver.verify(module, bean).await?;
        let session = receiver.open_session(&context, module, bean).await?;
        debug!(module = %module, bean, session = %session, receiver = receiver.name(), "Session opened");
        Ok(Locator::stateful(module.clone(), bean, view, session))
    }

    /// The transaction bridge of the receiver servicing `module`.
    pub fn transaction_resource(&self, module: &ModuleId) -> Result<TransactionResource, InvocationError> {
        let (receiver, context) = self.require_receiver(module)?;
        Ok(TransactionResource::new(receiver, context))
    }
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContext")
            .field("config", &self.config)
            .field("receivers", &self.receivers.len())
            .finish()
    }
}
