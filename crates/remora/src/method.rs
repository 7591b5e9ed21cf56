//! Method descriptors.
//!
//! A `Method` is what a proxy call names. Its `MethodKey` (name plus parameter
//! types) identifies it for dispatch; the return type is left out of the key so
//! that an override with a narrower return type still matches.

use std::borrow::Cow;
use std::fmt;

/// A parameter type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamType(Cow<'static, str>);

impl ParamType {
    /// Accepts any value.
    pub const ANY: ParamType = ParamType(Cow::Borrowed("any"));
    /// A reference to another remote object.
    pub const REMOTE_OBJECT: ParamType = ParamType(Cow::Borrowed("remote-object"));

    pub const fn named(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn owned(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How the caller expects to receive a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnType {
    /// No value; asynchronous calls are fire-and-forget.
    Unit,
    /// A plain value.
    Value,
    /// The method itself returns a future.
    Future,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    name: Cow<'static, str>,
    params: Vec<ParamType>,
}

impl MethodKey {
    pub fn new(name: impl Into<Cow<'static, str>>, params: Vec<ParamType>) -> Self {
        Self { name: name.into(), params }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    name: Cow<'static, str>,
    params: Vec<ParamType>,
    returns: ReturnType,
}

impl Method {
    pub fn new(name: impl Into<Cow<'static, str>>, params: Vec<ParamType>, returns: ReturnType) -> Self {
        Self { name: name.into(), params, returns }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    pub fn returns(&self) -> ReturnType {
        self.returns
    }

    pub fn key(&self) -> MethodKey {
        MethodKey { name: self.name.clone(), params: self.params.clone() }
    }

    /// Parameter type names as sent in an invocation request.
    pub fn signature(&self) -> Vec<String> {
        self.params.iter().map(|p| p.as_str().to_owned()).collect()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(p.as_str())?;
        }
        f.write_str(")")
    }
}
