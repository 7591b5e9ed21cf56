//! # Local Methods
//!
//! Calls a proxy answers by itself, without a receiver or the network.
//!
//! The table is built once on first use and only read afterwards. A method is
//! handled locally when its key is in the table *and* the entry's guard accepts
//! the call; otherwise the call goes to the dispatcher like any other.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::InvocationError;
use crate::locator::Handle;
use crate::locator::HomeHandle;
use crate::method::Method;
use crate::method::MethodKey;
use crate::method::ParamType;
use crate::proxy::Proxy;
use crate::proxy::ViewKind;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalMethod {
    Equals,
    HashCode,
    ToString,
    GetPrimaryKey,
    GetHandle,
    IsIdentical,
    GetHomeHandle,
}

/// The receiving proxy and the call's arguments.
pub struct LocalCall<'a> {
    pub proxy: &'a Proxy,
    pub args: &'a [Value],
}

impl LocalCall<'_> {
    fn other_proxy(&self) -> Option<&Proxy> {
        self.args.first().and_then(Value::as_proxy)
    }
}

impl LocalMethod {
    pub fn can_handle(self, call: &LocalCall<'_>) -> bool {
        match self {
            Self::Equals | Self::HashCode | Self::ToString => true,
            Self::GetPrimaryKey | Self::GetHandle | Self::IsIdentical => {
                call.proxy.view() == ViewKind::RemoteObject
            }
            Self::GetHomeHandle => call.proxy.view() == ViewKind::Home,
        }
    }

    pub fn invoke(self, call: &LocalCall<'_>) -> Result<Value, InvocationError> {
        let proxy = call.proxy;
        match self {
            Self::Equals | Self::IsIdentical => {
                let same = call.other_proxy().is_some_and(|other| other.handler() == proxy.handler());
                Ok(Value::Bool(same))
            }
            Self::HashCode => Ok(Value::Long(proxy.locator().hash_code() as i64)),
            Self::ToString => Ok(Value::String(proxy.to_string())),
            Self::GetPrimaryKey => match proxy.locator().primary_key() {
                Some(key) => Ok(Value::PrimaryKey(key.clone())),
                None => Err(InvocationError::RemoteInvocation(format!(
                    "cannot invoke get_primary_key on {}",
                    proxy
                ))),
            },
            Self::GetHandle => Ok(Value::Handle(Handle::new(proxy.locator_arc().clone()))),
            Self::GetHomeHandle => match proxy.locator().is_home() {
                true => Ok(Value::HomeHandle(HomeHandle::new(proxy.locator_arc().clone()))),
                false => Err(InvocationError::RemoteInvocation(format!(
                    "cannot invoke get_home_handle on {}",
                    proxy
                ))),
            },
        }
    }
}

static TABLE: LazyLock<HashMap<MethodKey, LocalMethod>> = LazyLock::new(|| {
    HashMap::from([
        (MethodKey::new("equals", vec![ParamType::ANY]), LocalMethod::Equals),
        (MethodKey::new("hash_code", vec![]), LocalMethod::HashCode),
        (MethodKey::new("to_string", vec![]), LocalMethod::ToString),
        (MethodKey::new("get_primary_key", vec![]), LocalMethod::GetPrimaryKey),
        (MethodKey::new("get_handle", vec![]), LocalMethod::GetHandle),
        (MethodKey::new("is_identical", vec![ParamType::REMOTE_OBJECT]), LocalMethod::IsIdentical),
        (MethodKey::new("get_home_handle", vec![]), LocalMethod::GetHomeHandle),
    ])
});

pub fn lookup(method: &Method) -> Option<LocalMethod> {
    TABLE.get(&method.key()).copied()
}

/// Handles the call locally if the table claims it.
///
/// `None` means the call must go remote.
pub fn try_handle(proxy: &Proxy, method: &Method, args: &[Value]) -> Option<Result<Value, InvocationError>> {
    let local = lookup(method)?;
    let call = LocalCall { proxy, args };
    if !local.can_handle(&call) {
        return None;
    }
    Some(local.invoke(&call))
}
