// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Interrupt-driven ADC1 for the light sensor taps, using direct PAC register access.
//!
//! [`Adc1::start`] kicks off one single-shot conversion and returns immediately. The ADC
//! interrupt handler collects the result with [`take_result`].

use stm32f7xx_hal::pac;

use crate::hw::traits::LightAdc;

pub struct Adc1 {
    adc: pac::ADC1,
}

fn configure_common() {
    let common = unsafe { &*pac::ADC_COMMON::ptr() };

    // ADC prescaler: PCLK2 / 4
    common.ccr.modify(|_, w| w.adcpre().div4());
}

fn init_basic_adc(adc: &pac::adc1::RegisterBlock) {
    // Power off to configure
    adc.cr2.modify(|_, w| w.adon().clear_bit());

    // 12-bit, right-aligned, software trigger, end-of-conversion interrupt
    adc.cr1.modify(|_, w| w.res().bits(0b00).eocie().set_bit());
    adc.cr2.modify(|_, w| {
        w.cont().clear_bit();
        w.align().right();
        w.exten().disabled();
        w
    });

    // Sequence length = 1 conversion
    adc.sqr1.modify(|_, w| w.l().bits(0));

    // Long sample time on both light channels (3 and 10)
    adc.smpr2.modify(|_, w| w.smp3().bits(0b111));
    adc.smpr1.modify(|_, w| w.smp10().bits(0b111));

    // Power on
    adc.cr2.modify(|_, w| w.adon().set_bit());
}

impl Adc1 {
    /// Create and initialize ADC1.
    pub fn new(adc1: pac::ADC1) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.adc1en().set_bit());

        configure_common();
        init_basic_adc(&adc1);

        Self { adc: adc1 }
    }

    /// Start one conversion of `channel`. The result arrives through the ADC interrupt.
    pub fn start(&mut self, channel: u8) {
        self.adc
            .sqr3
            .modify(|_, w| unsafe { w.sq1().bits(channel & 0x1F) });
        self.adc.cr2.modify(|_, w| w.swstart().set_bit());
    }

    #[inline]
    pub fn free(self) -> pac::ADC1 {
        self.adc
    }
}

impl LightAdc for Adc1 {
    fn start_conversion(&mut self, channel: u8) {
        self.start(channel);
    }
}

/// Read a finished conversion. Reading the data register clears EOC.
pub fn take_result() -> Option<u16> {
    let adc = unsafe { &*pac::ADC1::ptr() };
    if adc.sr.read().eoc().bit_is_set() {
        Some(adc.dr.read().data().bits())
    } else {
        None
    }
}
