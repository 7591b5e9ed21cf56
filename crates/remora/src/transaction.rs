//! # Transaction Bridge
//!
//! The operations a transaction coordinator drives through a receiver to
//! complete a transaction branch on a remote resource manager.
//!
//! ## Invariants
//! - Unsupported operations fail closed with `XA_RBOTHER`, forcing the
//!   coordinator to roll back. None of the defaults pretend to succeed, except
//!   `before_completion`, which has nothing to synchronize by default.
//! - `before_completion` returns only after every participant reachable through
//!   the receiver has run its own hook.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use remorpc::TransactionId;

use crate::receiver::Receiver;
use crate::receiver::ReceiverContext;

/// Standard distributed-transaction error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XaErrorCode {
    /// Rolled back for an unspecified reason.
    RbRollback,
    RbCommFail,
    RbDeadlock,
    RbIntegrity,
    /// Rolled back for a reason not on this list.
    RbOther,
    RbProto,
    RbTimeout,
    RbTransient,
    RmErr,
    NoTa,
    Inval,
    Proto,
    RmFail,
}

impl XaErrorCode {
    pub fn code(self) -> i32 {
        match self {
            Self::RbRollback => 100,
            Self::RbCommFail => 101,
            Self::RbDeadlock => 102,
            Self::RbIntegrity => 103,
            Self::RbOther => 104,
            Self::RbProto => 105,
            Self::RbTimeout => 106,
            Self::RbTransient => 107,
            Self::RmErr => -3,
            Self::NoTa => -4,
            Self::Inval => -5,
            Self::Proto => -6,
            Self::RmFail => -7,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        let code = match code {
            100 => Self::RbRollback,
            101 => Self::RbCommFail,
            102 => Self::RbDeadlock,
            103 => Self::RbIntegrity,
            104 => Self::RbOther,
            105 => Self::RbProto,
            106 => Self::RbTimeout,
            107 => Self::RbTransient,
            -3 => Self::RmErr,
            -4 => Self::NoTa,
            -5 => Self::Inval,
            -6 => Self::Proto,
            -7 => Self::RmFail,
            _ => return None,
        };
        Some(code)
    }

    /// Whether the branch is known to be rolled back.
    pub fn is_rollback(self) -> bool {
        (100..=107).contains(&self.code())
    }
}

impl fmt::Display for XaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transaction {operation} failed: {code}")]
pub struct XaError {
    pub code: XaErrorCode,
    pub operation: &'static str,
}

impl XaError {
    pub fn new(code: XaErrorCode, operation: &'static str) -> Self {
        Self { code, operation }
    }

    /// The failure of an operation the resource does not implement.
    pub fn unsupported(operation: &'static str) -> Self {
        Self::new(XaErrorCode::RbOther, operation)
    }
}

/// The outcome of a successful prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vote {
    /// The branch changed nothing; no commit will follow.
    ReadOnly,
    Ok,
}

impl Vote {
    pub const XA_OK: i32 = 0;
    pub const XA_RDONLY: i32 = 3;

    pub fn code(self) -> i32 {
        match self {
            Self::ReadOnly => Self::XA_RDONLY,
            Self::Ok => Self::XA_OK,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            Self::XA_RDONLY => Some(Self::ReadOnly),
            Self::XA_OK => Some(Self::Ok),
            _ => None,
        }
    }
}

#[async_trait]
pub trait TransactionBridge: Send + Sync {
    async fn send_prepare(&self, _context: &ReceiverContext, _transaction: &TransactionId) -> Result<Vote, XaError> {
        Err(XaError::unsupported("prepare"))
    }

    async fn send_commit(
        &self,
        _context: &ReceiverContext,
        _transaction: &TransactionId,
        _one_phase: bool,
    ) -> Result<(), XaError> {
        Err(XaError::unsupported("commit"))
    }

    async fn send_rollback(&self, _context: &ReceiverContext, _transaction: &TransactionId) -> Result<(), XaError> {
        Err(XaError::unsupported("rollback"))
    }

    async fn send_forget(&self, _context: &ReceiverContext, _transaction: &TransactionId) -> Result<(), XaError> {
        Err(XaError::unsupported("forget"))
    }

    async fn before_completion(&self, _context: &ReceiverContext, _transaction: &TransactionId) -> Result<(), XaError> {
        Ok(())
    }
}

/// A coordinator-facing handle on one receiver's transaction bridge.
///
/// Obtained from `ClientContext::transaction_resource` for the receiver that
/// services a module.
#[derive(Clone)]
pub struct TransactionResource {
    receiver: Arc<dyn Receiver>,
    context: ReceiverContext,
}

impl TransactionResource {
    pub(crate) fn new(receiver: Arc<dyn Receiver>, context: ReceiverContext) -> Self {
        Self { receiver, context }
    }

    pub fn receiver_name(&self) -> &str {
        self.receiver.name()
    }

    pub async fn prepare(&self, transaction: &TransactionId) -> Result<Vote, XaError> {
        self.receiver.send_prepare(&self.context, transaction).await
    }

    pub async fn commit(&self, transaction: &TransactionId, one_phase: bool) -> Result<(), XaError> {
        self.receiver.send_commit(&self.context, transaction, one_phase).await
    }

    pub async fn rollback(&self, transaction: &TransactionId) -> Result<(), XaError> {
        self.receiver.send_rollback(&self.context, transaction).await
    }

    pub async fn forget(&self, transaction: &TransactionId) -> Result<(), XaError> {
        self.receiver.send_forget(&self.context, transaction).await
    }

    pub async fn before_completion(&self, transaction: &TransactionId) -> Result<(), XaError> {
        self.receiver.before_completion(&self.context, transaction).await
    }
}

impl fmt::Debug for TransactionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionResource")
            .field("receiver", &self.receiver.name())
            .field("id", &self.context.id())
            .finish()
    }
}
