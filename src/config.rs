// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Compile-time configuration: protocol limits, sweep geometry, timing and flash layout.

/// Host link baud rate.
pub const BAUD_RATE: u32 = 9_600;

/// Capacity of the receive line buffer (one host field or content chunk).
pub const RX_BUF_SIZE: usize = 80;

/// Number of slots in the file table.
pub const MAX_FILES: usize = 10;

/// Maximum stored length of a file name.
pub const FILE_NAME_LEN: usize = 10;

/// Largest accepted file content, in bytes. Declared sizes are clamped to this.
pub const MAX_FILE_SIZE: u16 = 512;

/// Number of light calibration slots.
pub const CALIBRATION_SLOTS: usize = 10;

/// Servo pulse width at 0°, in microseconds.
pub const SERVO_MIN_PULSE_US: u16 = 600;

/// Servo pulse increment per degree, in microseconds.
pub const SERVO_US_PER_DEG: u16 = 10;

/// Servo PWM period, in microseconds (50 Hz).
pub const SERVO_PERIOD_US: u16 = 20_000;

/// Highest commandable servo angle.
pub const MAX_ANGLE_DEG: u16 = 179;

/// Angles visited by one sweep (0..SWEEP_STEPS).
pub const SWEEP_STEPS: u16 = 180;

/// Echo measurements sent per angle during an object scan.
pub const ECHO_SAMPLES_PER_ANGLE: u8 = 7;

/// Trigger pulse width, in microseconds (HC-SR04 needs at least 10).
pub const TRIGGER_PULSE_US: u32 = 12;

/// Echo timer ticks per centimetre of range (1 µs ticks, round trip).
pub const ECHO_TICKS_PER_CM: u16 = 58;

/// Delays used by the scan routines. All values in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScanTiming {
    /// Settling time after parking the servo at the start of a sweep.
    pub sweep_settle_ms: u32,
    /// Settling time after each servo step before an object measurement.
    pub echo_step_ms: u32,
    /// Pause between consecutive echo measurements at one angle.
    pub echo_gap_ms: u32,
    /// Settling time after each servo step before a light measurement.
    pub light_step_ms: u32,
    /// Pause after a light measurement.
    pub light_gap_ms: u32,
    /// Period of telemeter measurements.
    pub telemeter_period_ms: u32,
    /// Script delay before the first `set_delay` instruction.
    pub script_default_delay_ms: u32,
}

impl ScanTiming {
    pub const fn new() -> Self {
        Self {
            sweep_settle_ms: 200,
            echo_step_ms: 3,
            echo_gap_ms: 60,
            light_step_ms: 100,
            light_gap_ms: 50,
            telemeter_period_ms: 1_000,
            script_default_delay_ms: 500,
        }
    }

    /// All delays set to zero. Useful for simulation.
    pub const fn immediate() -> Self {
        Self {
            sweep_settle_ms: 0,
            echo_step_ms: 0,
            echo_gap_ms: 0,
            light_step_ms: 0,
            light_gap_ms: 0,
            telemeter_period_ms: 0,
            script_default_delay_ms: 0,
        }
    }

    /// Set the telemeter period.
    pub fn with_telemeter_period_ms(mut self, ms: u32) -> Self {
        self.telemeter_period_ms = ms;
        self
    }

    /// Set the initial script delay.
    pub fn with_script_delay_ms(mut self, ms: u32) -> Self {
        self.script_default_delay_ms = ms;
        self
    }
}

impl Default for ScanTiming {
    fn default() -> Self {
        Self::new()
    }
}

/// Placement of the three persistent flash areas.
///
/// ```text
/// [files_start, files_start + files_len)   file contents, segment-aligned placement
/// [table_addr, table_addr + segment)        file table block
/// [calibration_addr, ... + segment)         calibration block
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FlashLayout {
    pub files_start: u32,
    pub files_len: u32,
    pub table_addr: u32,
    pub calibration_addr: u32,
}

impl FlashLayout {
    /// End of the file region (exclusive).
    #[inline]
    pub const fn files_end(&self) -> u32 {
        self.files_start + self.files_len
    }
}

/// STM32F767 single-bank layout: sectors 9, 10 and 11 (256 KiB each).
pub const STM32F767_LAYOUT: FlashLayout = FlashLayout {
    files_start: 0x0814_0000,
    files_len: 0x0004_0000,
    table_addr: 0x0818_0000,
    calibration_addr: 0x081C_0000,
};

/// ADC channels of the two light sensor taps.
pub const LIGHT_CHANNELS: [u8; 2] = [3, 10];

/// Character LCD geometry.
pub const LCD_ROWS: u8 = 2;
pub const LCD_COLS: u8 = 16;
