// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Ultrasonic echo capture (HC-SR04 style sensor).
//!
//! The capture timer free-runs at 1 µs per tick and captures on both edges of the echo line. The
//! timer ISR feeds [`EchoCapture::on_capture`] for every captured edge and
//! [`EchoCapture::on_overflow`] when the counter wraps. The first edge after arming is the rise,
//! the second the fall. An overflow before the fall ends the measurement as a timeout, which
//! bounds every measurement by one timer period (65.536 ms).
//!
//! Status is published last with `Release`, after the timestamps and the width.

use core::sync::atomic::{AtomicU16, AtomicU8, Ordering};

use crate::config::ECHO_TICKS_PER_CM;
use crate::hw::traits::{IdleWait, SonarTrigger};

const IDLE: u8 = 0;
const PENDING: u8 = 1;
const DONE: u8 = 2;
const TIMEOUT: u8 = 3;

/// Outcome of one trigger.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Echo {
    /// Round-trip pulse width in timer ticks.
    Width(u16),
    /// No falling edge before the timer overflowed.
    Timeout,
}

impl Echo {
    /// Width in ticks, or the sentinel `0` for a timeout.
    ///
    /// A zero reading means "out of range", not "object at contact distance".
    #[inline]
    pub fn ticks(self) -> u16 {
        match self {
            Echo::Width(w) => w,
            Echo::Timeout => 0,
        }
    }

    /// Range in whole centimetres, `None` on timeout.
    pub fn centimetres(self) -> Option<u16> {
        match self {
            Echo::Width(w) => Some(w / ECHO_TICKS_PER_CM),
            Echo::Timeout => None,
        }
    }
}

/// Width of a pulse between two 16-bit timestamps, corrected for one counter wrap
/// (`fall + 65536 - rise` when `fall < rise`).
#[inline]
pub const fn pulse_width(rise: u16, fall: u16) -> u16 {
    fall.wrapping_sub(rise)
}

/// Capture state shared between the timer ISR and the measuring call.
pub struct EchoCapture {
    rise: AtomicU16,
    fall: AtomicU16,
    width: AtomicU16,
    edges: AtomicU8,
    status: AtomicU8,
}

impl EchoCapture {
    pub const fn new() -> Self {
        Self {
            rise: AtomicU16::new(0),
            fall: AtomicU16::new(0),
            width: AtomicU16::new(0),
            edges: AtomicU8::new(0),
            status: AtomicU8::new(IDLE),
        }
    }

    /// Forget any previous edges and wait for a fresh pair.
    pub fn arm(&self) {
        self.edges.store(0, Ordering::Relaxed);
        self.width.store(0, Ordering::Relaxed);
        self.status.store(PENDING, Ordering::Release);
    }

    /// Capture ISR: one edge captured at `timestamp`.
    pub fn on_capture(&self, timestamp: u16) {
        if self.status.load(Ordering::Acquire) != PENDING {
            return;
        }

        match self.edges.load(Ordering::Relaxed) {
            0 => {
                self.rise.store(timestamp, Ordering::Relaxed);
                self.edges.store(1, Ordering::Relaxed);
            }
            1 => {
                let rise = self.rise.load(Ordering::Relaxed);
                self.fall.store(timestamp, Ordering::Relaxed);
                self.width.store(pulse_width(rise, timestamp), Ordering::Relaxed);
                self.edges.store(2, Ordering::Relaxed);
                self.status.store(DONE, Ordering::Release);
            }
            _ => {}
        }
    }

    /// Overflow ISR: the counter wrapped.
    pub fn on_overflow(&self) {
        let _ = self
            .status
            .compare_exchange(PENDING, TIMEOUT, Ordering::Release, Ordering::Relaxed);
    }

    /// True once the pending measurement has finished either way.
    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self.status.load(Ordering::Acquire), DONE | TIMEOUT)
    }

    /// Result of the last measurement, `None` while pending or never armed.
    pub fn result(&self) -> Option<Echo> {
        match self.status.load(Ordering::Acquire) {
            DONE => Some(Echo::Width(self.width.load(Ordering::Relaxed))),
            TIMEOUT => Some(Echo::Timeout),
            _ => None,
        }
    }

    /// Number of edges seen since the last arm (0, 1 or 2).
    #[inline]
    pub fn edges(&self) -> u8 {
        self.edges.load(Ordering::Relaxed)
    }

    /// Raw `(rise, fall)` timestamps of the last completed pair.
    pub fn timestamps(&self) -> (u16, u16) {
        (
            self.rise.load(Ordering::Relaxed),
            self.fall.load(Ordering::Relaxed),
        )
    }

    /// Trigger the sensor and sleep until the echo completes or times out.
    pub fn trigger_and_measure<H>(&self, hw: &mut H) -> Echo
    where
        H: SonarTrigger + IdleWait,
    {
        // Hardware flags first, so a stale edge cannot land after the software reset.
        hw.arm_capture();
        self.arm();
        hw.pulse_trigger();

        hw.wait_until(|| self.is_complete());

        let echo = self.result().unwrap_or(Echo::Timeout);
        if echo == Echo::Timeout {
            log_debug!("echo timeout after {} edge(s)", self.edges());
        }
        echo
    }
}

impl Default for EchoCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_without_wrap_is_plain_difference() {
        for (rise, fall) in [(0u16, 1u16), (100, 1_258), (40_000, 65_535), (7, 7)] {
            let cap = EchoCapture::new();
            cap.arm();
            cap.on_capture(rise);
            assert!(!cap.is_complete());
            cap.on_capture(fall);
            assert_eq!(cap.result(), Some(Echo::Width(fall - rise)));
            assert_eq!(cap.timestamps(), (rise, fall));
        }
    }

    #[test]
    fn width_with_wrap_adds_counter_period() {
        for (rise, fall) in [(65_000u16, 500u16), (65_535, 0), (30_000, 29_999)] {
            let expected = (fall as u32 + 65_536 - rise as u32) as u16;
            assert_eq!(pulse_width(rise, fall), expected);

            let cap = EchoCapture::new();
            cap.arm();
            cap.on_capture(rise);
            cap.on_capture(fall);
            assert_eq!(cap.result(), Some(Echo::Width(expected)));
        }
    }

    #[test]
    fn overflow_before_second_edge_is_timeout() {
        let cap = EchoCapture::new();
        cap.arm();
        cap.on_capture(1_000);
        cap.on_overflow();
        assert_eq!(cap.result(), Some(Echo::Timeout));
        assert_eq!(cap.result().map(Echo::ticks), Some(0));

        // A late falling edge must not turn the timeout into a bogus width.
        cap.on_capture(2_000);
        assert_eq!(cap.result(), Some(Echo::Timeout));
    }

    #[test]
    fn overflow_after_completion_keeps_width() {
        let cap = EchoCapture::new();
        cap.arm();
        cap.on_capture(10);
        cap.on_capture(590);
        cap.on_overflow();
        assert_eq!(cap.result(), Some(Echo::Width(580)));
    }

    #[test]
    fn rearm_discards_stale_edge() {
        let cap = EchoCapture::new();
        cap.arm();
        cap.on_capture(123);
        assert_eq!(cap.edges(), 1);

        cap.arm();
        assert_eq!(cap.edges(), 0);
        cap.on_capture(1_000);
        cap.on_capture(1_580);
        assert_eq!(cap.result(), Some(Echo::Width(580)));
    }

    #[test]
    fn edges_and_overflow_ignored_while_idle() {
        let cap = EchoCapture::new();
        cap.on_capture(5);
        cap.on_overflow();
        assert_eq!(cap.result(), None);
        assert_eq!(cap.edges(), 0);
    }

    #[test]
    fn centimetres_from_ticks() {
        assert_eq!(Echo::Width(580).centimetres(), Some(10));
        assert_eq!(Echo::Timeout.centimetres(), None);
        assert_eq!(Echo::Timeout.ticks(), 0);
    }
}
