//! # Invocation Handlers
//!
//! The state behind a proxy: one shared locator plus the mode calls run in.
//!
//! Two handlers are equal when their locators are equal, whatever their mode.
//! A synchronous handler can be reduced to a `SerializedHandler` holding only
//! the locator; an asynchronous handler refuses, since asynchrony is a property
//! of the local call site and has no meaning once shipped elsewhere.

use std::hash::Hash;
use std::hash::Hasher;
use std::io::Cursor;
use std::sync::Arc;

use remopack::Encoder;
use remopack::Reader;

use crate::locator::Locator;
use crate::module_id::IdentityError;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("asynchronous proxies are not serializable")]
    NotSerializable,
    #[error("unknown locator kind {0}")]
    UnknownLocatorKind(u8),
    #[error("{0} trailing bytes after serialized handler")]
    TrailingBytes(usize),
    #[error("malformed serialized form: {0}")]
    Pack(#[from] remopack::Error),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationMode {
    /// The caller waits for the result.
    Sync,
    /// The caller gets a future (or nothing, for methods without a result).
    Async,
}

#[derive(Debug, Clone)]
pub struct InvocationHandler {
    locator: Arc<Locator>,
    mode: InvocationMode,
}

impl InvocationHandler {
    pub fn new(locator: Locator) -> Self {
        Self::shared(Arc::new(locator))
    }

    pub fn shared(locator: Arc<Locator>) -> Self {
        Self { locator, mode: InvocationMode::Sync }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn locator_arc(&self) -> &Arc<Locator> {
        &self.locator
    }

    pub fn mode(&self) -> InvocationMode {
        self.mode
    }

    pub fn is_async(&self) -> bool {
        self.mode == InvocationMode::Async
    }

    /// An asynchronous handler over the same locator.
    pub fn as_async(&self) -> Self {
        Self { locator: self.locator.clone(), mode: InvocationMode::Async }
    }

    pub fn serialize(&self) -> Result<SerializedHandler, SerializationError> {
        match self.mode {
            InvocationMode::Async => Err(SerializationError::NotSerializable),
            InvocationMode::Sync => Ok(SerializedHandler { locator: self.locator.clone() }),
        }
    }
}

impl PartialEq for InvocationHandler {
    fn eq(&self, other: &Self) -> bool {
        self.locator == other.locator
    }
}

impl Eq for InvocationHandler {}

impl Hash for InvocationHandler {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.locator.hash(state);
    }
}

/// The reduced form of a synchronous handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedHandler {
    locator: Arc<Locator>,
}

impl SerializedHandler {
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        let mut enc = Encoder::new();
        self.locator.write(&mut enc)?;
        Ok(enc.into_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        let mut r = Reader::new(Cursor::new(bytes));
        let locator = Locator::read(&mut r)?;
        let consumed = r.get_ref().position() as usize;
        if consumed != bytes.len() {
            return Err(SerializationError::TrailingBytes(bytes.len() - consumed));
        }
        Ok(Self { locator: Arc::new(locator) })
    }

    /// Restores a synchronous handler.
    pub fn into_handler(self) -> InvocationHandler {
        InvocationHandler::shared(self.locator)
    }
}
