//! # Value Codec
//!
//! Business arguments and results travel as opaque payload blobs. A
//! `ValueCodec` turns values into those blobs and back; the rest of the client
//! never looks inside.
//!
//! `PackCodec` is the stock codec: a one-byte tag per value followed by the
//! value in `remopack` framing.

use std::io::Cursor;
use std::io::Read;

use remopack::Encoder;
use remopack::Reader;
use remorpc::SessionId;

use crate::locator::Handle;
use crate::locator::HomeHandle;
use crate::locator::Locator;
use crate::locator::PrimaryKey;
use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("{0} values cannot be encoded")]
    Unsupported(&'static str),
    #[error("unknown value tag {0:#04x}")]
    UnknownTag(u8),
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error(transparent)]
    Pack(#[from] remopack::Error),
    #[error("malformed locator: {0}")]
    Locator(String),
}

pub trait ValueCodec: Send + Sync + 'static {
    fn encode_arguments(&self, args: &[Value]) -> Result<Vec<u8>, CodecError>;
    fn decode_result(&self, payload: &[u8]) -> Result<Value, CodecError>;
}

const TAG_UNIT: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_LONG: u8 = 0x03;
const TAG_STRING: u8 = 0x04;
const TAG_BYTES: u8 = 0x05;
const TAG_PRIMARY_KEY: u8 = 0x06;
const TAG_SESSION: u8 = 0x07;
const TAG_HANDLE: u8 = 0x08;
const TAG_HOME_HANDLE: u8 = 0x09;

#[derive(Debug, Clone, Copy, Default)]
pub struct PackCodec;

impl PackCodec {
    pub fn write_value(enc: &mut Encoder, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Unit => enc.u8(TAG_UNIT),
            Value::Bool(b) => {
                enc.u8(TAG_BOOL);
                enc.bool(*b);
            }
            Value::Int(v) => {
                enc.u8(TAG_INT);
                enc.i32(*v);
            }
            Value::Long(v) => {
                enc.u8(TAG_LONG);
                enc.i64(*v);
            }
            Value::String(s) => {
                enc.u8(TAG_STRING);
                enc.str(s)?;
            }
            Value::Bytes(b) => {
                enc.u8(TAG_BYTES);
                enc.blob(b)?;
            }
            Value::PrimaryKey(k) => {
                enc.u8(TAG_PRIMARY_KEY);
                enc.blob(k.as_bytes())?;
            }
            Value::Session(s) => {
                enc.u8(TAG_SESSION);
                enc.blob(s.as_bytes())?;
            }
            Value::Handle(h) => {
                enc.u8(TAG_HANDLE);
                h.locator().write(enc)?;
            }
            Value::HomeHandle(h) => {
                enc.u8(TAG_HOME_HANDLE);
                h.locator().write(enc)?;
            }
            Value::Proxy(_) => return Err(CodecError::Unsupported("proxy")),
        }
        Ok(())
    }

    pub fn read_value<R: Read>(r: &mut Reader<R>) -> Result<Value, CodecError> {
        let value = match r.u8()? {
            TAG_UNIT => Value::Unit,
            TAG_BOOL => Value::Bool(r.bool()?),
            TAG_INT => Value::Int(r.i32()?),
            TAG_LONG => Value::Long(r.i64()?),
            TAG_STRING => Value::String(r.string()?),
            TAG_BYTES => Value::Bytes(r.blob()?),
            TAG_PRIMARY_KEY => Value::PrimaryKey(PrimaryKey::new(r.blob()?)),
            TAG_SESSION => Value::Session(SessionId::new(r.blob()?)),
            TAG_HANDLE => Value::Handle(Handle::new(read_locator(r)?.into())),
            TAG_HOME_HANDLE => Value::HomeHandle(HomeHandle::new(read_locator(r)?.into())),
            other => return Err(CodecError::UnknownTag(other)),
        };
        Ok(value)
    }

    /// Encodes a single result, as a host would.
    pub fn encode_result(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut enc = Encoder::new();
        Self::write_value(&mut enc, value)?;
        Ok(enc.into_bytes())
    }

    /// Decodes an argument list, as a host would.
    pub fn decode_arguments(&self, payload: &[u8]) -> Result<Vec<Value>, CodecError> {
        let mut r = Reader::new(Cursor::new(payload));
        let count = r.packed_u32()?;
        let mut args = Vec::new();
        for _ in 0..count {
            args.push(Self::read_value(&mut r)?);
        }
        expect_end(&r, payload.len())?;
        Ok(args)
    }
}

impl ValueCodec for PackCodec {
    fn encode_arguments(&self, args: &[Value]) -> Result<Vec<u8>, CodecError> {
        let mut enc = Encoder::new();
        let count = u32::try_from(args.len()).map_err(|_| remopack::Error::BlobTooLarge(args.len()))?;
        enc.packed_u32(count);
        for arg in args {
            Self::write_value(&mut enc, arg)?;
        }
        Ok(enc.into_bytes())
    }

    fn decode_result(&self, payload: &[u8]) -> Result<Value, CodecError> {
        let mut r = Reader::new(Cursor::new(payload));
        let value = Self::read_value(&mut r)?;
        expect_end(&r, payload.len())?;
        Ok(value)
    }
}

fn read_locator<R: Read>(r: &mut Reader<R>) -> Result<Locator, CodecError> {
    Locator::read(r).map_err(|e| CodecError::Locator(e.to_string()))
}

fn expect_end(r: &Reader<Cursor<&[u8]>>, len: usize) -> Result<(), CodecError> {
    let consumed = r.get_ref().position() as usize;
    match consumed == len {
        true => Ok(()),
        false => Err(CodecError::TrailingBytes(len - consumed)),
    }
}
