// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Append-only record log in one erase segment.
//!
//! A slot is a marker byte followed by an `N`-byte payload. New records go to the first blank
//! slot after the newest one, payload first and marker last, so a write cut short by a reset is
//! skipped on the next scan. The segment is only erased once no blank slot is left.
//!
//! ```text
//! base: [0xA5][payload N] [0xA5][payload N] [0xFF...] ... segment end
//! ```

use crate::error::Result;
use crate::storage::flash::{segment_start, FlashMemory};

const MARKER: u8 = 0xA5;
const BLANK: u8 = 0xFF;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Journal<const N: usize> {
    base: u32,
    /// Next blank slot; `None` until the segment has been scanned.
    next: Option<u32>,
}

impl<const N: usize> Journal<N> {
    const STRIDE: u32 = N as u32 + 1;

    /// Log starting at the segment boundary `base`.
    pub const fn new(base: u32) -> Self {
        Self { base, next: None }
    }

    fn end<F: FlashMemory>(&self) -> u32 {
        segment_start(self.base, F::SEGMENT_SIZE) + F::SEGMENT_SIZE
    }

    /// Copy the newest record into `payload`. Returns `false` when the log holds none.
    pub fn load<F: FlashMemory>(&mut self, flash: &mut F, payload: &mut [u8; N]) -> Result<bool> {
        let end = self.end::<F>();
        let mut slot = self.base;
        let mut found = false;
        let mut buf = [0u8; N];

        while slot + Self::STRIDE <= end {
            let mut marker = [0u8; 1];
            flash.read(slot, &mut marker)?;
            flash.read(slot + 1, &mut buf)?;

            if marker[0] == MARKER {
                payload.copy_from_slice(&buf);
                found = true;
            } else if marker[0] == BLANK && buf.iter().all(|&b| b == BLANK) {
                break;
            }
            // Anything else is a torn write; skip it.
            slot += Self::STRIDE;
        }

        self.next = Some(slot);
        Ok(found)
    }

    /// Write a new record, erasing the segment first when it is full.
    pub fn append<F: FlashMemory>(&mut self, flash: &mut F, payload: &[u8; N]) -> Result<()> {
        let next = match self.next {
            Some(next) => next,
            None => {
                let mut scratch = [0u8; N];
                self.load(flash, &mut scratch)?;
                self.next.unwrap_or(self.base)
            }
        };

        let slot = if next + Self::STRIDE <= self.end::<F>() {
            next
        } else {
            let seg = segment_start(self.base, F::SEGMENT_SIZE);
            log_info!("journal {:#x}: full, erasing", seg);
            flash.erase_segment(seg)?;
            self.base
        };

        // Claim the slot before programming so a failed write is never reused.
        self.next = Some(slot + Self::STRIDE);
        flash.program(slot + 1, payload)?;
        flash.program(slot, &[MARKER])?;
        Ok(())
    }
}
