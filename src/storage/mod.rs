// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Persistent Storage
//!
//! - [`flash`] – NOR flash device trait and segment arithmetic
//! - [`files`] – ten-slot file store with segment-aware placement
//! - [`calibration`] – light calibration table
//! - [`journal`] – append-only record log used by the table and calibration blocks
//!
//! The file store is touched from the host link ISR (uploads) and from the main loop (browse,
//! execute, calibration), so it is shared through a critical-section mutex.

use core::cell::RefCell;

use critical_section::Mutex;

pub mod calibration;
pub mod files;
pub mod flash;
pub mod journal;

pub use calibration::CalibrationTable;
pub use files::{FileEntry, FileKind, FileStore};
pub use flash::FlashMemory;

/// File store shared between interrupt and main context.
pub type SharedStore<F> = Mutex<RefCell<FileStore<F>>>;

/// Run `f` with exclusive access to the shared store.
pub fn with_store<F, R>(shared: &SharedStore<F>, f: impl FnOnce(&mut FileStore<F>) -> R) -> R
where
    F: FlashMemory,
{
    critical_section::with(|cs| f(&mut shared.borrow_ref_mut(cs)))
}
