// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Light sensor sampling over two LDR voltage-divider taps.
//!
//! Each tap is converted once with the ADC in single-shot mode. The ADC ISR publishes the
//! result through [`AdcConversion::on_conversion_complete`]; the sampler sleeps until it lands.
//! The reported intensity is the darker (lower) of the two taps.

use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use crate::config::LIGHT_CHANNELS;
use crate::hw::traits::{IdleWait, LightAdc};

/// Latest conversion result, shared with the ADC ISR.
pub struct AdcConversion {
    value: AtomicU16,
    ready: AtomicBool,
}

impl AdcConversion {
    pub const fn new() -> Self {
        Self {
            value: AtomicU16::new(0),
            ready: AtomicBool::new(false),
        }
    }

    /// ADC ISR: store the converted value, then flag it ready.
    #[inline]
    pub fn on_conversion_complete(&self, value: u16) {
        self.value.store(value, Ordering::Relaxed);
        self.ready.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Convert `channel` and sleep until the result is published.
    pub fn convert<H>(&self, hw: &mut H, channel: u8) -> u16
    where
        H: LightAdc + IdleWait,
    {
        self.ready.store(false, Ordering::Release);
        hw.start_conversion(channel);
        hw.wait_until(|| self.is_ready());
        self.value.load(Ordering::Relaxed)
    }

    /// One light reading: the minimum over both sensor taps.
    pub fn sample_light<H>(&self, hw: &mut H) -> u16
    where
        H: LightAdc + IdleWait,
    {
        LIGHT_CHANNELS
            .iter()
            .map(|&ch| self.convert(hw, ch))
            .min()
            .unwrap_or(0)
    }
}

impl Default for AdcConversion {
    fn default() -> Self {
        Self::new()
    }
}
