//! # Locators
//!
//! A locator names exactly one remote target: a module, a bean within it, the
//! view (interface) being called, and whatever extra key the target kind needs.
//!
//! ## Invariants
//! - Locators are immutable once built and are shared behind `Arc`.
//! - Equality and hashing cover every field, including the session id or
//!   primary key.
//!
//! ## Reduced form
//!
//! `[app: str][module: str][distinct: str][bean: str][view: str][kind: u8][key: blob?]`
//!
//! This is what a serialized invocation handler carries.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::io::Read;
use std::sync::Arc;

use remopack::Encoder;
use remopack::Reader;
use remorpc::SessionId;

use crate::handler::SerializationError;
use crate::module_id::ModuleId;

const KIND_STATELESS: u8 = 0;
const KIND_STATEFUL: u8 = 1;
const KIND_ENTITY: u8 = 2;
const KIND_HOME: u8 = 3;

/// Opaque primary key of an entity-style target.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimaryKey(Vec<u8>);

impl PrimaryKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimaryKey({:02x?})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocatorKind {
    Stateless,
    /// Session-affine; every invocation carries the session id.
    Stateful(SessionId),
    Entity(PrimaryKey),
    Home,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    module: ModuleId,
    bean: String,
    view: String,
    kind: LocatorKind,
}

impl Locator {
    pub fn new(module: ModuleId, bean: impl Into<String>, view: impl Into<String>, kind: LocatorKind) -> Self {
        Self { module, bean: bean.into(), view: view.into(), kind }
    }

    pub fn stateless(module: ModuleId, bean: impl Into<String>, view: impl Into<String>) -> Self {
        Self::new(module, bean, view, LocatorKind::Stateless)
    }

    pub fn stateful(module: ModuleId, bean: impl Into<String>, view: impl Into<String>, session: SessionId) -> Self {
        Self::new(module, bean, view, LocatorKind::Stateful(session))
    }

    pub fn entity(module: ModuleId, bean: impl Into<String>, view: impl Into<String>, key: PrimaryKey) -> Self {
        Self::new(module, bean, view, LocatorKind::Entity(key))
    }

    pub fn home(module: ModuleId, bean: impl Into<String>, view: impl Into<String>) -> Self {
        Self::new(module, bean, view, LocatorKind::Home)
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    pub fn bean(&self) -> &str {
        &self.bean
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn kind(&self) -> &LocatorKind {
        &self.kind
    }

    pub fn session(&self) -> Option<&SessionId> {
        match &self.kind {
            LocatorKind::Stateful(session) => Some(session),
            _ => None,
        }
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        match &self.kind {
            LocatorKind::Entity(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_home(&self) -> bool {
        matches!(self.kind, LocatorKind::Home)
    }

    /// Stable within one process; two equal locators always agree.
    pub fn hash_code(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn write(&self, enc: &mut Encoder) -> remopack::Result<()> {
        enc.str(self.module.app_name())?;
        enc.str(self.module.module_name())?;
        enc.str(self.module.distinct_name())?;
        enc.str(&self.bean)?;
        enc.str(&self.view)?;
        match &self.kind {
            LocatorKind::Stateless => enc.u8(KIND_STATELESS),
            LocatorKind::Stateful(session) => {
                enc.u8(KIND_STATEFUL);
                enc.blob(session.as_bytes())?;
            }
            LocatorKind::Entity(key) => {
                enc.u8(KIND_ENTITY);
                enc.blob(key.as_bytes())?;
            }
            LocatorKind::Home => enc.u8(KIND_HOME),
        }
        Ok(())
    }

    pub fn read<R: Read>(r: &mut Reader<R>) -> Result<Self, SerializationError> {
        let app = r.string()?;
        let module_name = r.string()?;
        let distinct = r.string()?;
        let module = ModuleId::new(Some(&app), &module_name, Some(&distinct))?;
        let bean = r.string()?;
        let view = r.string()?;
        let kind = match r.u8()? {
            KIND_STATELESS => LocatorKind::Stateless,
            KIND_STATEFUL => LocatorKind::Stateful(SessionId::new(r.blob()?)),
            KIND_ENTITY => LocatorKind::Entity(PrimaryKey::new(r.blob()?)),
            KIND_HOME => LocatorKind::Home,
            other => return Err(SerializationError::UnknownLocatorKind(other)),
        };
        Ok(Self { module, bean, view, kind })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}!{}", self.module, self.bean, self.view)?;
        match &self.kind {
            LocatorKind::Stateless => Ok(()),
            LocatorKind::Stateful(session) => write!(f, " ({})", session),
            LocatorKind::Entity(key) => write!(f, " ({:?})", key),
            LocatorKind::Home => f.write_str(" (home)"),
        }
    }
}

/// A handle to a remote object, as returned by `get_handle`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    locator: Arc<Locator>,
}

impl Handle {
    pub fn new(locator: Arc<Locator>) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }
}

/// A handle to a home interface, as returned by `get_home_handle`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HomeHandle {
    locator: Arc<Locator>,
}

impl HomeHandle {
    pub fn new(locator: Arc<Locator>) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }
}
