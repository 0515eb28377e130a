// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! State shared between interrupt handlers and the main loop.
//!
//! Every field is a single atomic word. Handlers that publish several values (degree + flag,
//! capture timestamps + status) store the payload first and the flag last with `Release`; the
//! main loop reads the flag first with `Acquire`.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

use crate::config::MAX_ANGLE_DEG;
use crate::drivers::echo::EchoCapture;
use crate::drivers::light::AdcConversion;

/// Top-level routine selected by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// Waiting for a host command.
    Idle = 0,
    /// Servo sweep with echo measurements.
    ObjectScan = 1,
    /// Echo measurements at a fixed angle.
    Telemeter = 2,
    /// Servo sweep with light measurements.
    LightScan = 3,
    /// Servo sweep with echo and light measurements.
    ObjectLightScan = 4,
    /// Button-driven light calibration.
    Calibrate = 5,
    /// Page through a stored file on the LCD.
    FileBrowse = 6,
    /// Run a stored script.
    ScriptExecute = 7,
}

impl Mode {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Mode::ObjectScan,
            2 => Mode::Telemeter,
            3 => Mode::LightScan,
            4 => Mode::ObjectLightScan,
            5 => Mode::Calibrate,
            6 => Mode::FileBrowse,
            7 => Mode::ScriptExecute,
            _ => Mode::Idle,
        }
    }

    /// Routines that loop internally until the mode changes.
    pub fn is_continuous(self) -> bool {
        matches!(
            self,
            Mode::ObjectScan | Mode::Telemeter | Mode::LightScan | Mode::ObjectLightScan
        )
    }
}

/// Device-wide shared state. One instance lives in a `static` on the target.
pub struct DeviceContext {
    mode: AtomicU8,
    degree: AtomicU16,
    degree_changed: AtomicBool,
    selected_file: AtomicU8,
    selection_changed: AtomicBool,
    button: AtomicBool,

    /// Echo capture state, written by the timer ISR.
    pub echo: EchoCapture,
    /// Latest ADC conversion, written by the ADC ISR.
    pub adc: AdcConversion,
}

impl DeviceContext {
    pub const fn new() -> Self {
        Self {
            mode: AtomicU8::new(Mode::Idle as u8),
            degree: AtomicU16::new(0),
            degree_changed: AtomicBool::new(false),
            selected_file: AtomicU8::new(0),
            selection_changed: AtomicBool::new(false),
            button: AtomicBool::new(false),
            echo: EchoCapture::new(),
            adc: AdcConversion::new(),
        }
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode as u8, Ordering::Release);
    }

    /// Publish a new telemeter angle and select telemeter mode.
    pub fn request_telemeter(&self, degree: u16) {
        self.degree.store(degree.min(MAX_ANGLE_DEG), Ordering::Relaxed);
        self.degree_changed.store(true, Ordering::Release);
        self.set_mode(Mode::Telemeter);
    }

    /// Last requested telemeter angle.
    #[inline]
    pub fn degree(&self) -> u16 {
        self.degree.load(Ordering::Acquire)
    }

    /// Consume the degree-changed flag, returning the new angle if it was set.
    pub fn take_degree_change(&self) -> Option<u16> {
        if self.degree_changed.swap(false, Ordering::Acquire) {
            Some(self.degree.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    /// Select the file used by browse / execute and switch to `mode`.
    ///
    /// Raises the selection-changed flag even when `index` and `mode` are unchanged.
    pub fn select_file(&self, index: u8, mode: Mode) {
        self.selected_file.store(index, Ordering::Relaxed);
        self.selection_changed.store(true, Ordering::Release);
        self.set_mode(mode);
    }

    #[inline]
    pub fn selection_pending(&self) -> bool {
        self.selection_changed.load(Ordering::Acquire)
    }

    /// Consume the selection-changed flag.
    #[inline]
    pub fn take_selection_change(&self) -> bool {
        self.selection_changed.swap(false, Ordering::Acquire)
    }

    #[inline]
    pub fn selected_file(&self) -> usize {
        self.selected_file.load(Ordering::Acquire) as usize
    }

    /// Record a button press (button ISR).
    #[inline]
    pub fn press_button(&self) {
        self.button.store(true, Ordering::Release);
    }

    #[inline]
    pub fn button_pending(&self) -> bool {
        self.button.load(Ordering::Acquire)
    }

    /// Consume a pending button press.
    #[inline]
    pub fn take_button(&self) -> bool {
        self.button.swap(false, Ordering::Acquire)
    }
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_atomic() {
        let ctx = DeviceContext::new();
        assert_eq!(ctx.mode(), Mode::Idle);
        for mode in [
            Mode::ObjectScan,
            Mode::Telemeter,
            Mode::LightScan,
            Mode::ObjectLightScan,
            Mode::Calibrate,
            Mode::FileBrowse,
            Mode::ScriptExecute,
            Mode::Idle,
        ] {
            ctx.set_mode(mode);
            assert_eq!(ctx.mode(), mode);
        }
    }

    #[test]
    fn telemeter_request_sets_flag_once() {
        let ctx = DeviceContext::new();
        ctx.request_telemeter(45);
        assert_eq!(ctx.mode(), Mode::Telemeter);
        assert_eq!(ctx.take_degree_change(), Some(45));
        assert_eq!(ctx.take_degree_change(), None);
        assert_eq!(ctx.degree(), 45);
    }

    #[test]
    fn telemeter_angle_is_clamped() {
        let ctx = DeviceContext::new();
        ctx.request_telemeter(400);
        assert_eq!(ctx.degree(), MAX_ANGLE_DEG);
    }

    #[test]
    fn reselecting_same_file_raises_flag() {
        let ctx = DeviceContext::new();
        assert!(!ctx.take_selection_change());

        ctx.select_file(2, Mode::FileBrowse);
        assert!(ctx.take_selection_change());
        assert!(!ctx.selection_pending());

        ctx.select_file(2, Mode::FileBrowse);
        assert!(ctx.selection_pending());
        assert_eq!(ctx.selected_file(), 2);
    }

    #[test]
    fn button_press_is_consumed() {
        let ctx = DeviceContext::new();
        assert!(!ctx.take_button());
        ctx.press_button();
        assert!(ctx.button_pending());
        assert!(ctx.take_button());
        assert!(!ctx.take_button());
    }
}
