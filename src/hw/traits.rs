// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Hardware services the firmware core calls into.
//!
//! The STM32F7 board (`hw::board`) and the test mock (`hw::mock`) implement these. Register
//! configuration stays behind them; the core never touches a peripheral directly.

/// Low-power wait for interrupt-driven progress.
pub trait IdleWait {
    /// Sleep until the next interrupt has been serviced.
    fn wait_for_interrupt(&mut self);

    /// Sleep until `ready` returns true, re-checking after every interrupt.
    ///
    /// Implementations must not lose a wake-up that lands between the check and the sleep.
    fn wait_until<C: FnMut() -> bool>(&mut self, mut ready: C) {
        while !ready() {
            self.wait_for_interrupt();
        }
    }
}

/// Ultrasonic trigger output and echo capture timer control.
pub trait SonarTrigger {
    /// Reset the capture timer counter and clear pending capture/overflow flags.
    fn arm_capture(&mut self);

    /// Emit one trigger pulse.
    fn pulse_trigger(&mut self);
}

/// Interrupt-driven single-shot ADC.
pub trait LightAdc {
    /// Start one conversion. Completion is reported through the ADC interrupt.
    fn start_conversion(&mut self, channel: u8);
}

/// Servo PWM output.
pub trait ServoOutput {
    /// Set the high time of the 20 ms servo frame.
    fn set_pulse_us(&mut self, pulse_us: u16);
}

/// Outbound host link.
pub trait HostLink {
    fn write_bytes(&mut self, bytes: &[u8]);
}

/// Blocking delays.
pub trait BusyDelay {
    fn delay_ms(&mut self, ms: u32);
    fn delay_us(&mut self, us: u32);
}

/// Character display.
pub trait CharDisplay {
    fn clear(&mut self);
    fn set_cursor(&mut self, row: u8, col: u8);
    fn write_byte(&mut self, byte: u8);

    fn write_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.write_byte(b);
        }
    }
}

/// Everything a mode routine needs.
pub trait Board:
    IdleWait + SonarTrigger + LightAdc + ServoOutput + HostLink + BusyDelay + CharDisplay
{
}

impl<T> Board for T where
    T: IdleWait + SonarTrigger + LightAdc + ServoOutput + HostLink + BusyDelay + CharDisplay
{
}
