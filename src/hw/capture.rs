// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Echo capture on TIM3 channel 1.
//!
//! The timer free-runs at 1 MHz over the full 16-bit range. CH1 captures both edges of the echo
//! pin; the update (overflow) interrupt ends a measurement that never saw a falling edge.

use stm32f7xx_hal::pac;

/// Counter rate. One tick is one microsecond.
pub const TICK_HZ: u32 = 1_000_000;

/// What one TIM3 interrupt carried.
#[derive(Clone, Copy, Debug, Default)]
pub struct CaptureEvent {
    pub capture: Option<u16>,
    pub overflow: bool,
}

pub struct EchoTimer {
    tim: pac::TIM3,
}

impl EchoTimer {
    /// Configure TIM3 for both-edge input capture on TI1. `timclk_hz` is the APB1 timer clock.
    pub fn tim3(tim3: pac::TIM3, timclk_hz: u32) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim3en().set_bit());

        let tim = tim3;

        // Disable counter while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        let psc = (timclk_hz / TICK_HZ).saturating_sub(1) as u16;
        tim.psc.write(|w| unsafe { w.bits(psc as u32) });
        tim.arr.write(|w| unsafe { w.bits(0xFFFF) });

        // CH1 as input from TI1, no filter
        tim.ccmr1_input().modify(|_, w| w.cc1s().ti1());

        // Both edges (CC1P + CC1NP), capture enabled
        tim.ccer.modify(|_, w| {
            w.cc1p()
                .set_bit()
                .cc1np()
                .set_bit()
                .cc1e()
                .set_bit()
        });

        // Load the prescaler, then drop the update flag the load raised
        tim.egr.write(|w| w.ug().set_bit());
        tim.sr.write(|w| unsafe { w.bits(0) });

        // Capture and update interrupts
        tim.dier.modify(|_, w| w.cc1ie().set_bit().uie().set_bit());

        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self { tim }
    }

    /// Zero the counter and clear stale capture/overflow flags before a trigger.
    #[inline]
    pub fn arm(&mut self) {
        self.tim.cnt.write(|w| unsafe { w.bits(0) });
        self.tim.sr.write(|w| unsafe { w.bits(0) });
    }

    #[inline]
    pub fn free(self) -> pac::TIM3 {
        self.tim
    }
}

/// Acknowledge the pending TIM3 interrupt sources. Capture is reported before overflow.
pub fn service() -> CaptureEvent {
    let tim = unsafe { &*pac::TIM3::ptr() };
    let sr = tim.sr.read();
    let mut event = CaptureEvent::default();

    if sr.cc1if().bit_is_set() {
        // Reading CCR1 clears CC1IF.
        event.capture = Some(tim.ccr1.read().bits() as u16);
    }
    if sr.uif().bit_is_set() {
        tim.sr.modify(|_, w| w.uif().clear_bit());
        event.overflow = true;
    }
    event
}
