//! # Protocol Frames
//!
//! One struct per message kind. Every frame knows how to `encode` itself into a
//! complete message (header byte included) and how to `decode_body` once the
//! header byte has been consumed.
//!
//! Responses that the client decodes lazily also expose `read_tail`, which
//! reads what follows the 2-byte invocation id. Handlers read the id eagerly to
//! route the message and leave the tail for whoever consumes the result.
//!
//! ## Invariants
//! - **Panic Safety**: All decoding paths return `Result`.
//! - **Exact Reads**: Decoders consume exactly the bytes of their message and
//!   nothing beyond it.

use std::io::Cursor;
use std::io::Read;

use remopack::Encoder;
use remopack::Reader;

use crate::attachments::Attachments;
use crate::error::Error;
use crate::error::Result;
use crate::header::MessageHeader;
use crate::ids::SessionId;
use crate::ids::TransactionId;

/// The raw (un-normalized) naming triple of a deployed module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleTriple {
    pub app: String,
    pub module: String,
    pub distinct: String,
}

impl ModuleTriple {
    pub fn new(app: impl Into<String>, module: impl Into<String>, distinct: impl Into<String>) -> Self {
        Self { app: app.into(), module: module.into(), distinct: distinct.into() }
    }

    fn write(&self, enc: &mut Encoder) -> Result<()> {
        enc.str(&self.app)?;
        enc.str(&self.module)?;
        enc.str(&self.distinct)?;
        Ok(())
    }

    fn read<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        Ok(Self {
            app: r.string()?,
            module: r.string()?,
            distinct: r.string()?,
        })
    }
}

fn start(header: MessageHeader) -> Encoder {
    let mut enc = Encoder::new();
    enc.u8(header.as_u8());
    enc
}

/// Asks the host to create a stateful session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOpenRequest {
    pub invocation_id: u16,
    pub module: ModuleTriple,
    pub bean: String,
    pub attachments: Attachments,
}

impl SessionOpenRequest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut enc = start(MessageHeader::SessionOpenRequest);
        enc.u16(self.invocation_id);
        self.module.write(&mut enc)?;
        enc.str(&self.bean)?;
        self.attachments.write(&mut enc)?;
        Ok(enc.into_bytes())
    }

    pub fn decode_body<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        Ok(Self {
            invocation_id: r.u16()?,
            module: ModuleTriple::read(r)?,
            bean: r.string()?,
            attachments: Attachments::read(r)?,
        })
    }
}

/// Carries the identifier of a freshly opened session.
///
/// `[Header][InvocationId: u16][Len: packed][SessionId: Len][Attachments]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOpenResponse {
    pub invocation_id: u16,
    pub session: SessionId,
    pub attachments: Attachments,
}

impl SessionOpenResponse {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut enc = start(MessageHeader::SessionOpenResponse);
        enc.u16(self.invocation_id);
        enc.blob(self.session.as_bytes())?;
        self.attachments.write(&mut enc)?;
        Ok(enc.into_bytes())
    }

    pub fn decode_body<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        let invocation_id = r.u16()?;
        let (session, attachments) = Self::read_tail(r)?;
        Ok(Self { invocation_id, session, attachments })
    }

    /// Reads the session identifier and attachment block.
    pub fn read_tail<R: Read>(r: &mut Reader<R>) -> Result<(SessionId, Attachments)> {
        let session = SessionId::new(r.blob()?);
        let attachments = Attachments::read(r)?;
        Ok((session, attachments))
    }
}

/// A method call on a remote component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub invocation_id: u16,
    pub module: ModuleTriple,
    pub bean: String,
    pub view: String,
    pub method: String,
    /// Parameter type names, in declaration order.
    pub signature: Vec<String>,
    pub session: Option<SessionId>,
    /// Business arguments, already encoded by the value codec.
    pub payload: Vec<u8>,
    pub attachments: Attachments,
}

impl InvocationRequest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut enc = start(MessageHeader::InvocationRequest);
        enc.u16(self.invocation_id);
        self.module.write(&mut enc)?;
        enc.str(&self.bean)?;
        enc.str(&self.view)?;
        enc.str(&self.method)?;

        let arity = u32::try_from(self.signature.len())
            .map_err(|_| Error::ProtocolViolation("signature too long".into()))?;
        enc.packed_u32(arity);
        for param in &self.signature {
            enc.str(param)?;
        }

        match &self.session {
            Some(session) => {
                enc.bool(true);
                enc.blob(session.as_bytes())?;
            }
            None => enc.bool(false),
        }

        enc.blob(&self.payload)?;
        self.attachments.write(&mut enc)?;
        Ok(enc.into_bytes())
    }

    pub fn decode_body<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        let invocation_id = r.u16()?;
        let module = ModuleTriple::read(r)?;
        let bean = r.string()?;
        let view = r.string()?;
        let method = r.string()?;

        let arity = r.packed_u32()?;
        let mut signature = Vec::new();
        for _ in 0..arity {
            signature.push(r.string()?);
        }

        let session = match r.bool()? {
            true => Some(SessionId::new(r.blob()?)),
            false => None,
        };

        Ok(Self {
            invocation_id,
            module,
            bean,
            view,
            method,
            signature,
            session,
            payload: r.blob()?,
            attachments: Attachments::read(r)?,
        })
    }
}

/// Asks the host to abandon an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelRequest {
    pub invocation_id: u16,
    pub may_interrupt: bool,
}

impl CancelRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut enc = start(MessageHeader::InvocationCancel);
        enc.u16(self.invocation_id);
        enc.bool(self.may_interrupt);
        enc.into_bytes()
    }

    pub fn decode_body<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        Ok(Self { invocation_id: r.u16()?, may_interrupt: r.bool()? })
    }
}

/// A successful invocation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResponse {
    pub invocation_id: u16,
    pub payload: Vec<u8>,
    pub attachments: Attachments,
}

impl InvocationResponse {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut enc = start(MessageHeader::InvocationResponse);
        enc.u16(self.invocation_id);
        enc.blob(&self.payload)?;
        self.attachments.write(&mut enc)?;
        Ok(enc.into_bytes())
    }

    pub fn decode_body<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        let invocation_id = r.u16()?;
        let (payload, attachments) = Self::read_tail(r)?;
        Ok(Self { invocation_id, payload, attachments })
    }

    pub fn read_tail<R: Read>(r: &mut Reader<R>) -> Result<(Vec<u8>, Attachments)> {
        let payload = r.blob()?;
        let attachments = Attachments::read(r)?;
        Ok((payload, attachments))
    }
}

/// Why the host refused or failed an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The business method threw.
    ApplicationException,
    NoSuchComponent,
    NoSuchMethod,
    SessionNotActive,
    NotStateful,
}

impl FailureKind {
    pub fn header(self) -> MessageHeader {
        match self {
            Self::ApplicationException => MessageHeader::ApplicationException,
            Self::NoSuchComponent => MessageHeader::NoSuchComponent,
            Self::NoSuchMethod => MessageHeader::NoSuchMethod,
            Self::SessionNotActive => MessageHeader::SessionNotActive,
            Self::NotStateful => MessageHeader::NotStateful,
        }
    }

    pub fn from_header(header: MessageHeader) -> Option<Self> {
        match header {
            MessageHeader::ApplicationException => Some(Self::ApplicationException),
            MessageHeader::NoSuchComponent => Some(Self::NoSuchComponent),
            MessageHeader::NoSuchMethod => Some(Self::NoSuchMethod),
            MessageHeader::SessionNotActive => Some(Self::SessionNotActive),
            MessageHeader::NotStateful => Some(Self::NotStateful),
            _ => None,
        }
    }

    /// Only application exceptions carry an attachment block.
    fn has_attachments(self) -> bool {
        matches!(self, Self::ApplicationException)
    }
}

/// A failed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationFailure {
    pub kind: FailureKind,
    pub invocation_id: u16,
    pub message: String,
    pub attachments: Attachments,
}

impl InvocationFailure {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut enc = start(self.kind.header());
        enc.u16(self.invocation_id);
        enc.str(&self.message)?;
        if self.kind.has_attachments() {
            self.attachments.write(&mut enc)?;
        }
        Ok(enc.into_bytes())
    }

    pub fn decode_body<R: Read>(kind: FailureKind, r: &mut Reader<R>) -> Result<Self> {
        let invocation_id = r.u16()?;
        let (message, attachments) = Self::read_tail(kind, r)?;
        Ok(Self { kind, invocation_id, message, attachments })
    }

    pub fn read_tail<R: Read>(kind: FailureKind, r: &mut Reader<R>) -> Result<(String, Attachments)> {
        let message = r.string()?;
        let attachments = match kind.has_attachments() {
            true => Attachments::read(r)?,
            false => Attachments::new(),
        };
        Ok((message, attachments))
    }
}

/// Announces that modules became reachable (or stopped being reachable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAvailability {
    pub available: bool,
    pub modules: Vec<ModuleTriple>,
}

impl ModuleAvailability {
    pub fn header(&self) -> MessageHeader {
        match self.available {
            true => MessageHeader::ModuleAvailable,
            false => MessageHeader::ModuleUnavailable,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut enc = start(self.header());
        let count = u32::try_from(self.modules.len())
            .map_err(|_| Error::ProtocolViolation("too many modules".into()))?;
        enc.packed_u32(count);
        for module in &self.modules {
            module.write(&mut enc)?;
        }
        Ok(enc.into_bytes())
    }

    pub fn decode_body<R: Read>(available: bool, r: &mut Reader<R>) -> Result<Self> {
        let count = r.packed_u32()?;
        let mut modules = Vec::new();
        for _ in 0..count {
            modules.push(ModuleTriple::read(r)?);
        }
        Ok(Self { available, modules })
    }
}

/// Which step of two-phase completion a transaction message drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Commit { one_phase: bool },
    Rollback,
    Prepare,
    Forget,
    BeforeCompletion,
}

impl TxKind {
    pub fn header(self) -> MessageHeader {
        match self {
            Self::Commit { .. } => MessageHeader::TxCommit,
            Self::Rollback => MessageHeader::TxRollback,
            Self::Prepare => MessageHeader::TxPrepare,
            Self::Forget => MessageHeader::TxForget,
            Self::BeforeCompletion => MessageHeader::TxBeforeCompletion,
        }
    }
}

/// Drives one transaction branch on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub invocation_id: u16,
    pub kind: TxKind,
    pub transaction: TransactionId,
}

impl TxRequest {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut enc = start(self.kind.header());
        enc.u16(self.invocation_id);
        enc.blob(self.transaction.as_bytes())?;
        if let TxKind::Commit { one_phase } = self.kind {
            enc.bool(one_phase);
        }
        Ok(enc.into_bytes())
    }

    pub fn decode_body<R: Read>(header: MessageHeader, r: &mut Reader<R>) -> Result<Self> {
        let invocation_id = r.u16()?;
        let transaction = TransactionId::new(r.blob()?);
        let kind = match header {
            MessageHeader::TxCommit => TxKind::Commit { one_phase: r.bool()? },
            MessageHeader::TxRollback => TxKind::Rollback,
            MessageHeader::TxPrepare => TxKind::Prepare,
            MessageHeader::TxForget => TxKind::Forget,
            MessageHeader::TxBeforeCompletion => TxKind::BeforeCompletion,
            other => {
                return Err(Error::ProtocolViolation(format!(
                    "{:?} is not a transaction request",
                    other
                )));
            }
        };
        Ok(Self { invocation_id, kind, transaction })
    }
}

/// The host's answer to a transaction message. Prepare answers carry a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxResponse {
    pub invocation_id: u16,
    pub value: Option<u32>,
}

impl TxResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut enc = start(MessageHeader::TxResponse);
        enc.u16(self.invocation_id);
        match self.value {
            Some(v) => {
                enc.bool(true);
                enc.packed_u32(v);
            }
            None => enc.bool(false),
        }
        enc.into_bytes()
    }

    pub fn decode_body<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        let invocation_id = r.u16()?;
        Ok(Self { invocation_id, value: Self::read_tail(r)? })
    }

    pub fn read_tail<R: Read>(r: &mut Reader<R>) -> Result<Option<u32>> {
        match r.bool()? {
            true => Ok(Some(r.packed_u32()?)),
            false => Ok(None),
        }
    }
}

/// Tells a synchronous caller to stop waiting and continue asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncMethodNotification {
    pub invocation_id: u16,
}

impl AsyncMethodNotification {
    pub fn encode(&self) -> Vec<u8> {
        let mut enc = start(MessageHeader::AsyncMethodNotification);
        enc.u16(self.invocation_id);
        enc.into_bytes()
    }

    pub fn decode_body<R: Read>(r: &mut Reader<R>) -> Result<Self> {
        Ok(Self { invocation_id: r.u16()? })
    }
}

/// Any complete message, decoded eagerly.
///
/// The client's own inbound path decodes lazily through the handlers; this is
/// for peers that want the whole message at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    SessionOpenRequest(SessionOpenRequest),
    SessionOpenResponse(SessionOpenResponse),
    InvocationRequest(InvocationRequest),
    Cancel(CancelRequest),
    InvocationResponse(InvocationResponse),
    Failure(InvocationFailure),
    ModuleAvailability(ModuleAvailability),
    AsyncMethodNotification(AsyncMethodNotification),
    TxRequest(TxRequest),
    TxResponse(TxResponse),
}

impl Message {
    /// Decodes one message, requiring that it fills `bytes` exactly.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(Cursor::new(bytes));
        let header = MessageHeader::read(&mut r)?;
        let msg = match header {
            MessageHeader::SessionOpenRequest => Self::SessionOpenRequest(SessionOpenRequest::decode_body(&mut r)?),
            MessageHeader::SessionOpenResponse => Self::SessionOpenResponse(SessionOpenResponse::decode_body(&mut r)?),
            MessageHeader::InvocationRequest => Self::InvocationRequest(InvocationRequest::decode_body(&mut r)?),
            MessageHeader::InvocationCancel => Self::Cancel(CancelRequest::decode_body(&mut r)?),
            MessageHeader::InvocationResponse => Self::InvocationResponse(InvocationResponse::decode_body(&mut r)?),
            MessageHeader::ModuleAvailable => Self::ModuleAvailability(ModuleAvailability::decode_body(true, &mut r)?),
            MessageHeader::ModuleUnavailable => Self::ModuleAvailability(ModuleAvailability::decode_body(false, &mut r)?),
            MessageHeader::AsyncMethodNotification => {
                Self::AsyncMethodNotification(AsyncMethodNotification::decode_body(&mut r)?)
            }
            MessageHeader::TxResponse => Self::TxResponse(TxResponse::decode_body(&mut r)?),
            MessageHeader::TxCommit
            | MessageHeader::TxRollback
            | MessageHeader::TxPrepare
            | MessageHeader::TxForget
            | MessageHeader::TxBeforeCompletion => Self::TxRequest(TxRequest::decode_body(header, &mut r)?),
            MessageHeader::ApplicationException
            | MessageHeader::NoSuchComponent
            | MessageHeader::NoSuchMethod
            | MessageHeader::SessionNotActive
            | MessageHeader::NotStateful => {
                // from_header covers every arm listed here
                let kind = FailureKind::from_header(header)
                    .ok_or_else(|| Error::ProtocolViolation(format!("{:?} is not a failure", header)))?;
                Self::Failure(InvocationFailure::decode_body(kind, &mut r)?)
            }
        };

        let consumed = r.get_ref().position() as usize;
        if consumed != bytes.len() {
            return Err(Error::ProtocolViolation(format!(
                "{} trailing bytes after {:?}",
                bytes.len() - consumed,
                header
            )));
        }
        Ok(msg)
    }

    pub fn header(&self) -> MessageHeader {
        match self {
            Self::SessionOpenRequest(_) => MessageHeader::SessionOpenRequest,
            Self::SessionOpenResponse(_) => MessageHeader::SessionOpenResponse,
            Self::InvocationRequest(_) => MessageHeader::InvocationRequest,
            Self::Cancel(_) => MessageHeader::InvocationCancel,
            Self::InvocationResponse(_) => MessageHeader::InvocationResponse,
            Self::Failure(f) => f.kind.header(),
            Self::ModuleAvailability(m) => m.header(),
            Self::AsyncMethodNotification(_) => MessageHeader::AsyncMethodNotification,
            Self::TxRequest(t) => t.kind.header(),
            Self::TxResponse(_) => MessageHeader::TxResponse,
        }
    }
}
