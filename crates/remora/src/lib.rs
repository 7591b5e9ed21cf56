//! # Remora
//!
//! The client side of remote component invocation: proxies that stand in for
//! remote objects, a dispatcher that routes their calls through the receiver
//! servicing the target module, and a remoting receiver that speaks the
//! `remorpc` protocol over any `Transport`.
//!
//! ## Philosophy
//!
//! - **Resolve before sending**: a call without a current `ClientContext`, or
//!   for a module no receiver accepts, fails before any bytes are written.
//! - **Decode on demand**: inbound handlers read only the invocation id. The
//!   rest of a response stays in its stream until the caller claims it.
//! - **Explicit outcomes**: a call resolves to a value, a pending future, or
//!   nothing (fire-and-forget). Nothing travels through side channels.
//!
//! ## Quick start
//!
//! ```ignore
//! let client = ClientContext::new(ClientConfig::default());
//! client.register_receiver(RemotingReceiver::new("node-1", Box::new(transport), client.config()));
//!
//! let proxy = Proxy::new(Locator::stateless(module, "Calculator", "Calc"), ViewKind::Business);
//! let outcome = client.scope(proxy.invoke(&add, vec![1.into(), 2.into()])).await?;
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod correlation;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod interceptor;
pub mod invocation;
pub mod local_methods;
pub mod locator;
pub mod method;
pub mod mock_transport;
pub mod module_id;
pub mod producer;
pub mod protocol;
pub mod proxy;
pub mod receiver;
pub mod registry;
pub mod remoting;
pub mod stream;
pub mod transaction;
pub mod transport;
pub mod value;


pub use config::ClientConfig;
pub use context::ClientContext;
pub use error::InvocationError;
pub use interceptor::ClientInterceptor;
pub use invocation::InvocationFuture;
pub use invocation::Outcome;
pub use locator::Locator;
pub use method::Method;
pub use method::ParamType;
pub use method::ReturnType;
pub use module_id::ModuleId;
pub use proxy::Proxy;
pub use proxy::ViewKind;
pub use receiver::Receiver;
pub use receiver::ReceiverContext;
pub use remoting::RemotingReceiver;
pub use value::Value;
