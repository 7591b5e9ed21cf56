//! # Message Headers
//!
//! Every message starts with one header byte naming its kind.

use std::io::Read;

use remopack::Reader;

use crate::error::Error;
use crate::error::Result;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageHeader {
    SessionOpenRequest = 0x01,
    SessionOpenResponse = 0x02,
    InvocationRequest = 0x03,
    InvocationCancel = 0x04,
    InvocationResponse = 0x05,
    ApplicationException = 0x06,
    ModuleAvailable = 0x08,
    ModuleUnavailable = 0x09,
    NoSuchComponent = 0x0A,
    NoSuchMethod = 0x0B,
    SessionNotActive = 0x0C,
    NotStateful = 0x0D,
    AsyncMethodNotification = 0x0E,
    TxCommit = 0x0F,
    TxRollback = 0x10,
    TxPrepare = 0x11,
    TxForget = 0x12,
    TxBeforeCompletion = 0x13,
    TxResponse = 0x14,
}

impl MessageHeader {
    /// Returns the header for a byte, or `None` if the byte is not assigned.
    pub fn from_u8(b: u8) -> Option<Self> {
        use MessageHeader::*;
        let header = match b {
            0x01 => SessionOpenRequest,
            0x02 => SessionOpenResponse,
            0x03 => InvocationRequest,
            0x04 => InvocationCancel,
            0x05 => InvocationResponse,
            0x06 => ApplicationException,
            0x08 => ModuleAvailable,
            0x09 => ModuleUnavailable,
            0x0A => NoSuchComponent,
            0x0B => NoSuchMethod,
            0x0C => SessionNotActive,
            0x0D => NotStateful,
            0x0E => AsyncMethodNotification,
            0x0F => TxCommit,
            0x10 => TxRollback,
            0x11 => TxPrepare,
            0x12 => TxForget,
            0x13 => TxBeforeCompletion,
            0x14 => TxResponse,
            _ => return None,
        };
        Some(header)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Reads and validates one header byte.
    pub fn read<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        let b = r.u8()?;
        Self::from_u8(b).ok_or(Error::UnknownHeader(b))
    }

    /// Reads a header byte and fails unless it is `expected`.
    pub fn expect<R: Read>(r: &mut Reader<R>, expected: Self) -> Result<()> {
        let found = Self::read(r)?;
        if found != expected {
            return Err(Error::UnexpectedHeader { expected, found });
        }
        Ok(())
    }
}
