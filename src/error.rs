// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Error types for flash, file store and script operations.
//!
//! Nothing here reaches the host: callers log the error and continue, in line with the
//! degrade-and-continue policy of the device.

use core::fmt;

/// Result type for fallible firmware operations.
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Flash device rejected an operation
    Flash(FlashError),
    /// File store bookkeeping failure
    Storage(StorageError),
    /// Stored script could not be decoded
    Script(ScriptError),
}

/// Flash-level errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Address range outside the device
    OutOfBounds,
    /// Erase address not on a segment boundary
    Misaligned,
    /// Programming error flagged by the controller
    ProgramFailed,
    /// Erase error flagged by the controller
    EraseFailed,
}

/// File store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Slot index outside the table
    InvalidIndex,
    /// File would end past the file region
    RegionFull,
    /// Slot holds no finalized file
    NoContent,
    /// No upload in progress for the slot
    NoUpload,
}

/// Script decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScriptError {
    /// Character outside `0-9a-fA-F`
    BadHex,
    /// Opcode without a known instruction
    UnknownOpcode(u8),
    /// Operand missing at end of script
    Truncated,
}

impl From<FlashError> for Error {
    fn from(e: FlashError) -> Self {
        Error::Flash(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}

impl From<ScriptError> for Error {
    fn from(e: ScriptError) -> Self {
        Error::Script(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Flash(e) => write!(f, "flash error: {:?}", e),
            Error::Storage(e) => write!(f, "storage error: {:?}", e),
            Error::Script(e) => write!(f, "script error: {:?}", e),
        }
    }
}
