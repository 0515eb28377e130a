// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! HD44780 character LCD on a 4-bit parallel bus, write-only (R/W tied low).

use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use embedded_hal::digital::v2::OutputPin;

use crate::config::LCD_COLS;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_INCREMENT: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;

/// DDRAM address of each row start.
const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

pub struct Lcd<RS, EN, D4, D5, D6, D7> {
    rs: RS,
    en: EN,
    data: (D4, D5, D6, D7),
}

impl<RS, EN, D4, D5, D6, D7> Lcd<RS, EN, D4, D5, D6, D7>
where
    RS: OutputPin,
    EN: OutputPin,
    D4: OutputPin,
    D5: OutputPin,
    D6: OutputPin,
    D7: OutputPin,
{
    /// Run the 4-bit power-on initialization sequence and clear the display.
    pub fn new<D>(rs: RS, en: EN, data: (D4, D5, D6, D7), delay: &mut D) -> Self
    where
        D: DelayMs<u32> + DelayUs<u32>,
    {
        let mut lcd = Self { rs, en, data };
        lcd.rs.set_low().ok();
        lcd.en.set_low().ok();

        delay.delay_ms(40u32);
        // Three 8-bit "function set" nibbles, then switch to 4-bit.
        for wait_us in [4_500u32, 150, 150] {
            lcd.write_nibble(0x3, delay);
            delay.delay_us(wait_us);
        }
        lcd.write_nibble(0x2, delay);
        delay.delay_us(100);

        lcd.command(CMD_FUNCTION_4BIT_2LINE, delay);
        lcd.command(CMD_DISPLAY_ON, delay);
        lcd.command(CMD_ENTRY_INCREMENT, delay);
        lcd.clear(delay);
        lcd
    }

    pub fn clear<D: DelayUs<u32>>(&mut self, delay: &mut D) {
        self.command(CMD_CLEAR, delay);
        delay.delay_us(2_000);
    }

    pub fn set_cursor<D: DelayUs<u32>>(&mut self, row: u8, col: u8, delay: &mut D) {
        let offset = ROW_OFFSETS[(row as usize).min(ROW_OFFSETS.len() - 1)];
        self.command(CMD_SET_DDRAM | (offset + col.min(LCD_COLS - 1)), delay);
    }

    pub fn write_char<D: DelayUs<u32>>(&mut self, byte: u8, delay: &mut D) {
        self.rs.set_high().ok();
        self.write_byte(byte, delay);
    }

    fn command<D: DelayUs<u32>>(&mut self, cmd: u8, delay: &mut D) {
        self.rs.set_low().ok();
        self.write_byte(cmd, delay);
    }

    fn write_byte<D: DelayUs<u32>>(&mut self, byte: u8, delay: &mut D) {
        self.write_nibble(byte >> 4, delay);
        self.write_nibble(byte & 0x0F, delay);
        delay.delay_us(50);
    }

    fn write_nibble<D: DelayUs<u32>>(&mut self, nibble: u8, delay: &mut D) {
        set(&mut self.data.0, nibble & 0x1 != 0);
        set(&mut self.data.1, nibble & 0x2 != 0);
        set(&mut self.data.2, nibble & 0x4 != 0);
        set(&mut self.data.3, nibble & 0x8 != 0);

        self.en.set_high().ok();
        delay.delay_us(1);
        self.en.set_low().ok();
        delay.delay_us(1);
    }
}

#[inline]
fn set<P: OutputPin>(pin: &mut P, high: bool) {
    if high {
        pin.set_high().ok();
    } else {
        pin.set_low().ok();
    }
}
