//! # Attachments
//!
//! Typed key/value metadata that rides along with requests and responses.
//!
//! ## Format
//!
//! `[Count: u8]` followed by `Count × [Key: u16][Value: blob]`. An empty block is
//! the single byte `0x00`.

use std::collections::BTreeMap;
use std::io::Read;

use remopack::Encoder;
use remopack::Reader;

use crate::error::Error;
use crate::error::Result;

/// Largest number of entries a single block can carry.
pub const MAX_ATTACHMENTS: usize = u8::MAX as usize;

/// The closed set of attachment keys.
///
/// Codes `0x0001` and `0x0002` are reserved; every other code is carried
/// through untouched as `Custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentKey {
    /// The transaction the invocation is enlisted in.
    TransactionId,
    /// Routing hint naming the node a session lives on.
    SessionAffinity,
    Custom(u16),
}

impl AttachmentKey {
    pub fn from_code(code: u16) -> Self {
        match code {
            0x0001 => Self::TransactionId,
            0x0002 => Self::SessionAffinity,
            other => Self::Custom(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::TransactionId => 0x0001,
            Self::SessionAffinity => 0x0002,
            Self::Custom(code) => code,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachments {
    entries: BTreeMap<AttachmentKey, Vec<u8>>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value under the same key.
    ///
    /// Keys are normalized through their wire code, so `Custom(1)` lands on
    /// `TransactionId`.
    pub fn insert(&mut self, key: AttachmentKey, value: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.entries.insert(AttachmentKey::from_code(key.code()), value.into())
    }

    pub fn get(&self, key: AttachmentKey) -> Option<&[u8]> {
        self.entries.get(&AttachmentKey::from_code(key.code())).map(Vec::as_slice)
    }

    pub fn remove(&mut self, key: AttachmentKey) -> Option<Vec<u8>> {
        self.entries.remove(&AttachmentKey::from_code(key.code()))
    }

    /// Copies every entry of `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &Attachments) {
        for (k, v) in &other.entries {
            self.entries.insert(*k, v.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttachmentKey, &[u8])> {
        self.entries.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Writes the block, in key order.
    pub fn write(&self, enc: &mut Encoder) -> Result<()> {
        if self.entries.len() > MAX_ATTACHMENTS {
            return Err(Error::ProtocolViolation(format!(
                "{} attachments exceed the limit of {}",
                self.entries.len(),
                MAX_ATTACHMENTS
            )));
        }
        enc.u8(self.entries.len() as u8);
        for (key, value) in &self.entries {
            enc.u16(key.code());
            enc.blob(value)?;
        }
        Ok(())
    }

    /// Reads a block. Later duplicates of a key overwrite earlier ones.
    pub fn read<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        let count = r.u8()?;
        let mut out = Self::new();
        for _ in 0..count {
            let key = AttachmentKey::from_code(r.u16()?);
            let value = r.blob()?;
            out.entries.insert(key, value);
        }
        Ok(out)
    }
}
