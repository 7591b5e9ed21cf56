//! Client-side stand-ins for remote objects.

use std::fmt;
use std::sync::Arc;

use crate::dispatcher;
use crate::error::InvocationError;
use crate::handler::InvocationHandler;
use crate::handler::InvocationMode;
use crate::invocation::Outcome;
use crate::locator::Locator;
use crate::method::Method;
use crate::value::Value;

/// Which capabilities the proxied interface exposes beyond its business methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Business methods only.
    Business,
    /// A remote object: supports `get_primary_key`, `get_handle` and `is_identical`.
    RemoteObject,
    /// A home interface: supports `get_home_handle`.
    Home,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proxy {
    handler: InvocationHandler,
    view: ViewKind,
}

impl Proxy {
    pub fn new(locator: Locator, view: ViewKind) -> Self {
        Self { handler: InvocationHandler::new(locator), view }
    }

    pub fn with_handler(handler: InvocationHandler, view: ViewKind) -> Self {
        Self { handler, view }
    }

    pub fn handler(&self) -> &InvocationHandler {
        &self.handler
    }

    pub fn locator(&self) -> &Locator {
        self.handler.locator()
    }

    pub fn locator_arc(&self) -> &Arc<Locator> {
        self.handler.locator_arc()
    }

    pub fn view(&self) -> ViewKind {
        self.view
    }

    /// The same remote object, called asynchronously.
    pub fn as_async(&self) -> Self {
        Self { handler: self.handler.as_async(), view: self.view }
    }

    /// Calls `method` in this proxy's own mode.
    pub async fn invoke(&self, method: &Method, args: Vec<Value>) -> Result<Outcome, InvocationError> {
        dispatcher::dispatch(self, method, args).await
    }

    /// Calls `method` in an explicit mode, leaving this proxy untouched.
    pub async fn invoke_with_mode(
        &self,
        method: &Method,
        args: Vec<Value>,
        mode: InvocationMode,
    ) -> Result<Outcome, InvocationError> {
        dispatcher::dispatch_with_mode(self, method, args, mode).await
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proxy for remote component {}", self.locator())
    }
}
