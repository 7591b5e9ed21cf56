//! Values that flow through the client: arguments, results and the answers of
//! locally handled methods.

use remorpc::SessionId;

use crate::locator::Handle;
use crate::locator::HomeHandle;
use crate::locator::PrimaryKey;
use crate::proxy::Proxy;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i32),
    Long(i64),
    String(String),
    Bytes(Vec<u8>),
    PrimaryKey(PrimaryKey),
    Session(SessionId),
    Handle(Handle),
    HomeHandle(HomeHandle),
    /// Another proxy. Only meaningful to locally handled methods.
    Proxy(Proxy),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::PrimaryKey(_) => "primary-key",
            Value::Session(_) => "session",
            Value::Handle(_) => "handle",
            Value::HomeHandle(_) => "home-handle",
            Value::Proxy(_) => "proxy",
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Value::Proxy(p) => Some(p),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
