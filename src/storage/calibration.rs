// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Light calibration table.
//!
//! Ten reference intensities recorded from the calibration routine, replayed to the host ahead of
//! every light scan. Each recording appends the whole table, two bytes per slot little endian, to
//! a [`Journal`] in its own flash block. Slots never recorded read as zero.

use crate::config::CALIBRATION_SLOTS;
use crate::error::Result;
use crate::storage::flash::FlashMemory;
use crate::storage::journal::Journal;

const ERASED: u16 = 0xFFFF;
const BLOCK_LEN: usize = CALIBRATION_SLOTS * 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalibrationTable {
    journal: Journal<BLOCK_LEN>,
    values: [u16; CALIBRATION_SLOTS],
}

impl CalibrationTable {
    pub const fn new(address: u32) -> Self {
        Self {
            journal: Journal::new(address),
            values: [0; CALIBRATION_SLOTS],
        }
    }

    /// Refresh the RAM copy from flash.
    pub fn load<F: FlashMemory>(&mut self, flash: &mut F) -> Result<()> {
        let mut raw = [0xFFu8; BLOCK_LEN];
        if !self.journal.load(flash, &mut raw)? {
            log_info!("calibration: none stored");
        }

        for (value, bytes) in self.values.iter_mut().zip(raw.chunks_exact(2)) {
            *value = match u16::from_le_bytes([bytes[0], bytes[1]]) {
                ERASED => 0,
                v => v,
            };
        }
        Ok(())
    }

    /// Store the `count`-th recording. Slots wrap modulo the table size. Returns the slot.
    pub fn record<F: FlashMemory>(
        &mut self,
        flash: &mut F,
        count: usize,
        value: u16,
    ) -> Result<usize> {
        let slot = count % CALIBRATION_SLOTS;
        self.values[slot] = value;
        self.persist(flash)?;
        Ok(slot)
    }

    /// Append the RAM copy to the calibration block.
    pub fn persist<F: FlashMemory>(&mut self, flash: &mut F) -> Result<()> {
        let mut raw = [0u8; BLOCK_LEN];
        for (bytes, value) in raw.chunks_exact_mut(2).zip(self.values.iter()) {
            bytes.copy_from_slice(&value.to_le_bytes());
        }
        self.journal.append(flash, &raw)
    }

    #[inline]
    pub fn values(&self) -> &[u16; CALIBRATION_SLOTS] {
        &self.values
    }
}
