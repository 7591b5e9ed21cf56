//! Naming of deployable units.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("module name is required")]
    MissingModuleName,
}

/// Names a deployable unit by application, module and distinct name.
///
/// Absent application names fall back to the module name and absent distinct
/// names to `""`. Equality and hashing only ever see the normalized triple, so
/// `ModuleId::new(None, "m", None) == ModuleId::new(Some("m"), "m", Some(""))`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    app_name: String,
    module_name: String,
    distinct_name: String,
}

impl ModuleId {
    pub fn new(app_name: Option<&str>, module_name: &str, distinct_name: Option<&str>) -> Result<Self, IdentityError> {
        if module_name.is_empty() {
            return Err(IdentityError::MissingModuleName);
        }
        Ok(Self {
            app_name: app_name.unwrap_or(module_name).to_owned(),
            module_name: module_name.to_owned(),
            distinct_name: distinct_name.unwrap_or("").to_owned(),
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn distinct_name(&self) -> &str {
        &self.distinct_name
    }

    /// The triple as carried on the wire.
    pub fn to_triple(&self) -> remorpc::ModuleTriple {
        remorpc::ModuleTriple::new(&*self.app_name, &*self.module_name, &*self.distinct_name)
    }

    /// Builds an identity from an announced triple. An empty application name
    /// on the wire means the same as an absent one.
    pub fn from_triple(triple: &remorpc::ModuleTriple) -> Result<Self, IdentityError> {
        let app = match triple.app.as_str() {
            "" => None,
            app => Some(app),
        };
        Self::new(app, &triple.module, Some(&triple.distinct))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.module_name)?;
        if !self.distinct_name.is_empty() {
            write!(f, "/{}", self.distinct_name)?;
        }
        Ok(())
    }
}
