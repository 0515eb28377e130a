// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Top-level mode dispatcher.
//!
//! One pass of [`Dispatcher::step`] reads the shared mode and runs the matching routine:
//!
//! - `Idle` sleeps until the next interrupt.
//! - Scans and the telemeter loop internally and return once the mode changes.
//! - Calibrate and FileBrowse do one unit of work, then sleep until a button press or a mode
//!   change.
//! - ScriptExecute runs the selected script once and drops back to `Idle`.

use crate::app::browse::BrowseSession;
use crate::app::calibrate::CalibrationSession;
use crate::app::script::Interpreter;
use crate::config::{ScanTiming, MAX_FILE_SIZE};
use crate::context::{DeviceContext, Mode};
use crate::hw::traits::Board;
use crate::storage::{with_store, CalibrationTable, FlashMemory, SharedStore};

use super::scan;

pub struct Dispatcher<'a, F: FlashMemory> {
    ctx: &'a DeviceContext,
    store: &'a SharedStore<F>,
    timing: ScanTiming,
    calibration: CalibrationTable,
    last_mode: Mode,
    calibrate: CalibrationSession,
    browse: BrowseSession,
}

impl<'a, F: FlashMemory> Dispatcher<'a, F> {
    pub fn new(ctx: &'a DeviceContext, store: &'a SharedStore<F>, timing: ScanTiming) -> Self {
        let calibration_addr = with_store(store, |s| s.layout().calibration_addr);
        Self {
            ctx,
            store,
            timing,
            calibration: CalibrationTable::new(calibration_addr),
            last_mode: Mode::Idle,
            calibrate: CalibrationSession::new(),
            browse: BrowseSession::new(),
        }
    }

    /// Load the file table and calibration block from flash.
    ///
    /// Failures are logged and leave the affected table empty.
    pub fn restore(&mut self) {
        let calibration = &mut self.calibration;
        let (files, cal) = with_store(self.store, |s| {
            let files = s.load();
            let cal = calibration.load(s.flash_mut());
            (files, cal)
        });

        if let Err(e) = files {
            log_error!("file table load failed: {:?}", e);
        }
        if let Err(e) = cal {
            log_error!("calibration load failed: {:?}", e);
        }
    }

    #[inline]
    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    /// Run the routine for the current mode once.
    pub fn step<B: Board>(&mut self, board: &mut B) {
        let mode = self.ctx.mode();
        if mode != self.last_mode {
            log_info!("mode {:?} -> {:?}", self.last_mode, mode);
            self.enter(mode);
            self.last_mode = mode;
        }

        let ctx = self.ctx;
        match mode {
            Mode::Idle => board.wait_for_interrupt(),
            Mode::ObjectScan => scan::object_scan(ctx, board, &self.timing),
            Mode::Telemeter => scan::telemeter(ctx, board, &self.timing),
            Mode::LightScan => {
                scan::light_scan(ctx, board, &self.timing, self.calibration.values())
            }
            Mode::ObjectLightScan => {
                scan::object_light_scan(ctx, board, &self.timing, self.calibration.values())
            }
            Mode::Calibrate => {
                self.calibrate
                    .step(ctx, board, self.store, &mut self.calibration);
                board.wait_until(|| ctx.button_pending() || ctx.mode() != Mode::Calibrate);
            }
            Mode::FileBrowse => {
                self.browse.step(ctx, board, self.store);
                board.wait_until(|| {
                    ctx.button_pending()
                        || ctx.selection_pending()
                        || ctx.mode() != Mode::FileBrowse
                });
            }
            Mode::ScriptExecute => {
                self.execute(board);
                // A host command during the run takes precedence over the return to idle.
                if ctx.mode() == Mode::ScriptExecute {
                    ctx.set_mode(Mode::Idle);
                }
            }
        }
    }

    /// Run forever.
    pub fn run<B: Board>(&mut self, board: &mut B) -> ! {
        loop {
            self.step(board);
        }
    }

    /// Per-session state reset on mode entry.
    fn enter(&mut self, mode: Mode) {
        match mode {
            Mode::Calibrate => {
                // A press left over from another mode must not count as a sample.
                self.ctx.take_button();
                self.calibrate = CalibrationSession::new();
            }
            Mode::FileBrowse => {
                self.ctx.take_button();
                self.browse = BrowseSession::new();
            }
            _ => {}
        }
    }

    fn execute<B: Board>(&mut self, board: &mut B) {
        let index = self.ctx.selected_file();
        let mut script = [0u8; MAX_FILE_SIZE as usize];

        let len = match with_store(self.store, |s| s.read(index, &mut script).map(|b| b.len())) {
            Ok(len) => len,
            Err(e) => {
                log_warn!("script {}: {:?}", index, e);
                return;
            }
        };

        log_info!("script {}: run {} bytes", index, len);
        if let Err(e) = Interpreter::new(self.ctx, &self.timing).run(board, &script[..len]) {
            log_warn!("script {}: stopped: {:?}", index, e);
        }
    }
}
