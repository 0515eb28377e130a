// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! NOR flash device interface.
//!
//! Erase works on whole segments and sets every byte to `0xFF`; programming can only clear bits.
//! Addresses are absolute.

use crate::error::FlashError;

pub trait FlashMemory {
    /// Erase granularity in bytes. Segments are aligned to their size.
    const SEGMENT_SIZE: u32;

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError>;

    fn program(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashError>;

    /// Erase the segment starting at `addr`. Fails with `Misaligned` off a segment boundary.
    fn erase_segment(&mut self, addr: u32) -> Result<(), FlashError>;
}

/// Start of the segment containing `addr`.
#[inline]
pub const fn segment_start(addr: u32, segment_size: u32) -> u32 {
    addr - addr % segment_size
}
