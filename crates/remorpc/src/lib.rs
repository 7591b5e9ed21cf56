//! # Remorpc
//!
//! The message vocabulary spoken between a remora client and a component host.
//!
//! ## Layers
//!
//! 1. **Framing** (`remopack`): integers, packed lengths, blobs.
//! 2. **Messages** (this crate): a header byte plus a fixed field order per
//!    message kind, an attachment block codec, and the opaque identifiers the
//!    host mints.
//!
//! Business arguments and results are never interpreted here. Requests and
//! responses carry them as opaque payload blobs.
//!
//! ## Correlation
//!
//! Every request and response (other than module announcements) carries a
//! 2-byte invocation id directly after its header. The client allocates these
//! ids and the host echoes them back.

pub mod attachments;
pub mod error;
pub mod frame;
pub mod header;
pub mod ids;

#[cfg(test)]
mod tests;

pub use attachments::AttachmentKey;
pub use attachments::Attachments;
pub use error::Error;
pub use error::Result;
pub use frame::AsyncMethodNotification;
pub use frame::CancelRequest;
pub use frame::FailureKind;
pub use frame::InvocationFailure;
pub use frame::InvocationRequest;
pub use frame::InvocationResponse;
pub use frame::Message;
pub use frame::ModuleAvailability;
pub use frame::ModuleTriple;
pub use frame::SessionOpenRequest;
pub use frame::SessionOpenResponse;
pub use frame::TxKind;
pub use frame::TxRequest;
pub use frame::TxResponse;
pub use header::MessageHeader;
pub use ids::SessionId;
pub use ids::TransactionId;

/// Reads the invocation id that follows a header byte.
pub fn read_invocation_id<R: std::io::Read>(r: &mut remopack::Reader<R>) -> Result<u16> {
    Ok(r.u16()?)
}
