// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Button-driven light calibration.
//!
//! Every button press samples the light sensor into the next calibration slot and reports
//! `6:<slot>`. After the tenth sample the routine reports `6:DONE` and drops back to idle.

use crate::config::CALIBRATION_SLOTS;
use crate::context::{DeviceContext, Mode};
use crate::hw::traits::Board;
use crate::protocol::telemetry::{send_calibration_done, send_calibration_step};
use crate::storage::{with_store, CalibrationTable, FlashMemory, SharedStore};

/// Progress of one calibration run. Reset whenever the mode is entered.
#[derive(Debug, Default)]
pub struct CalibrationSession {
    recorded: usize,
}

impl CalibrationSession {
    pub const fn new() -> Self {
        Self { recorded: 0 }
    }

    #[inline]
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// Handle a pending button press, if any.
    pub fn step<B, F>(
        &mut self,
        ctx: &DeviceContext,
        board: &mut B,
        store: &SharedStore<F>,
        table: &mut CalibrationTable,
    ) where
        B: Board,
        F: FlashMemory,
    {
        if !ctx.take_button() {
            return;
        }

        // Sample outside the lock: the conversion completes through an interrupt.
        let value = ctx.adc.sample_light(board);
        let count = self.recorded;

        match with_store(store, |s| table.record(s.flash_mut(), count, value)) {
            Ok(slot) => {
                log_info!("calibration slot {} = {}", slot, value);
                send_calibration_step(board, slot as u32);
            }
            Err(e) => log_error!("calibration write failed: {:?}", e),
        }

        self.recorded += 1;
        if self.recorded >= CALIBRATION_SLOTS {
            send_calibration_done(board);
            ctx.set_mode(Mode::Idle);
        }
    }
}
