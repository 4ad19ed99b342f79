//! Crate-wide error type.
//!
//! Fatal machine faults (stack over/underflow, out-of-segment access, division
//! by zero, ...) and host I/O failures both flow through this type instead of
//! bare `String`s. Save/restore failures are reported through it too, but the
//! opcode bodies that call save/restore degrade those into branch polarity
//! rather than propagating them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZError {
    /// A machine fault that halts execution: the opcode/address is named in
    /// the message so the failure can be traced back to the story file.
    #[error("{0}")]
    Fatal(String),

    /// A host I/O failure (reading the story file, the console, or a save file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZError {
    pub fn fatal(msg: impl Into<String>) -> Self {
        ZError::Fatal(msg.into())
    }
}

pub type ZResult<T> = Result<T, ZError>;
