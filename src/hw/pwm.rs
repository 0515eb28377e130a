// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Servo PWM on TIM4 channel 1: 1 µs resolution in a 20 ms frame.

use stm32f7xx_hal::pac;

use crate::config::SERVO_PERIOD_US;
use crate::hw::traits::ServoOutput;

pub struct ServoPwm {
    tim: pac::TIM4,
}

impl ServoPwm {
    /// Configure TIM4 CH1 in PWM mode 1. `timclk_hz` is the APB1 timer clock.
    pub fn tim4(tim4: pac::TIM4, timclk_hz: u32) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim4en().set_bit());

        let tim = tim4;
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        let psc = (timclk_hz / 1_000_000).saturating_sub(1);
        tim.psc.write(|w| unsafe { w.bits(psc) });
        tim.arr.write(|w| unsafe { w.bits(SERVO_PERIOD_US as u32 - 1) });
        tim.ccr1.write(|w| unsafe { w.bits(0) });

        // PWM mode 1 with preload on CH1
        tim.ccmr1_output()
            .modify(|_, w| w.oc1m().pwm_mode1().oc1pe().set_bit());
        tim.ccer.modify(|_, w| w.cc1e().set_bit());

        tim.cr1.modify(|_, w| w.arpe().set_bit());
        tim.egr.write(|w| w.ug().set_bit());
        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self { tim }
    }

    #[inline]
    pub fn free(self) -> pac::TIM4 {
        self.tim
    }
}

impl ServoOutput for ServoPwm {
    fn set_pulse_us(&mut self, pulse_us: u16) {
        let pulse = pulse_us.min(SERVO_PERIOD_US - 1) as u32;
        self.tim.ccr1.write(|w| unsafe { w.bits(pulse) });
    }
}
