//! # Message Inputs
//!
//! An inbound message is handed over as a readable stream that must be closed
//! once whoever consumes it is done. `InputGuard` owns the stream and closes it
//! exactly once: either explicitly through `close`, or on drop if every other
//! path was skipped (an early `?`, a discarded result, a panic unwinding).

use std::io;
use std::io::Read;

use tracing::warn;

/// A readable inbound message with an explicit release step.
pub trait MessageInput: Read + Send {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl MessageInput for io::Cursor<Vec<u8>> {}

pub struct InputGuard {
    input: Option<Box<dyn MessageInput>>,
}

impl InputGuard {
    pub fn new(input: Box<dyn MessageInput>) -> Self {
        Self { input: Some(input) }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(Box::new(io::Cursor::new(bytes)))
    }

    pub fn is_closed(&self) -> bool {
        self.input.is_none()
    }

    /// Closes the stream. Later calls are no-ops.
    pub fn close(&mut self) -> io::Result<()> {
        match self.input.take() {
            Some(mut input) => input.close(),
            None => Ok(()),
        }
    }
}

impl Read for InputGuard {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.input.as_mut() {
            Some(input) => input.read(buf),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "message input already closed")),
        }
    }
}

impl Drop for InputGuard {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close message input");
        }
    }
}
