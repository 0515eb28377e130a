// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! USART host link.
//!
//! Transmit goes through the HAL's blocking `Tx` half. Receive is interrupt driven: the RX
//! interrupt handler drains the data register with [`read_byte`] and feeds each byte to the
//! command receiver.
//!
//! To access the link from the host machine, connect to the ST-LINK virtual COM port:
//! ```text
//! $ screen /dev/tty.usbmodem* 9600
//! ```

use nb::block;

use stm32f7xx_hal::{
    pac,
    prelude::*,
    serial::{Instance, Pins, Serial, Tx},
};

use crate::hw::traits::HostLink;

/// ISR bits: RXNE, ORE.
const ISR_RXNE: u32 = 1 << 5;
const ISR_ORE: u32 = 1 << 3;
/// ICR bit: ORECF.
const ICR_ORECF: u32 = 1 << 3;

pub struct Usart<U: Instance> {
    tx: Tx<U>,
}

impl<U: Instance> Usart<U> {
    /// Split the port and keep the transmit half. Receive is handled in the RX interrupt.
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, _rx) = serial.split();
        Self { tx }
    }

    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        let _ = block!(self.tx.write(b));
    }

    /// Block until the last byte has left the shift register.
    #[inline]
    pub fn flush(&mut self) {
        let _ = block!(self.tx.flush());
    }
}

impl<U: Instance> HostLink for Usart<U> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_byte(b);
        }
    }
}

/// Enable the USART3 receive-not-empty interrupt.
pub fn listen_usart3() {
    let usart = unsafe { &*pac::USART3::ptr() };
    usart.cr1.modify(|_, w| w.rxneie().set_bit());
}

/// Pop one received byte from USART3, clearing an overrun if one occurred.
///
/// Called from the RX interrupt until it returns `None`.
pub fn read_byte() -> Option<u8> {
    let usart = unsafe { &*pac::USART3::ptr() };
    let isr = usart.isr.read().bits();

    if isr & ISR_ORE != 0 {
        usart.icr.write(|w| unsafe { w.bits(ICR_ORECF) });
        log_warn!("usart3 overrun");
    }
    if isr & ISR_RXNE != 0 {
        Some(usart.rdr.read().bits() as u8)
    } else {
        None
    }
}
