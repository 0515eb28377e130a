// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Host-side simulation of the board for tests.
//!
//! [`MockBoard`] implements every hardware service trait. Each call to
//! [`IdleWait::wait_for_interrupt`] delivers exactly one simulated interrupt, in this order:
//!
//! 1. the first scheduled [`SimEvent`] whose trigger has been reached,
//! 2. a pending ADC conversion,
//! 3. a pending echo (both edges, or an overflow when no echo is configured).
//!
//! Host bytes are run through a real [`CommandReceiver`], so tests drive the device with the
//! same byte streams a host would send. A wait with nothing to deliver counts toward a stall
//! limit; exceeding it panics instead of hanging the test.
//!
//! [`MockFlash`] is a NOR flash model: erase sets `0xFF`, programming ANDs bits in.

use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use core::cell::RefCell;

use critical_section::Mutex;

use crate::config::{FlashLayout, LCD_COLS, LCD_ROWS, LIGHT_CHANNELS};
use crate::context::DeviceContext;
use crate::error::FlashError;
use crate::hw::traits::*;
use crate::protocol::CommandReceiver;
use crate::storage::{FileStore, FlashMemory, SharedStore};

/// Segment size of the mock device.
pub const MOCK_SEGMENT: u32 = 512;

/// Three file segments, then one segment each for the table and the calibration block.
pub const MOCK_LAYOUT: FlashLayout = FlashLayout {
    files_start: 0x1000,
    files_len: 3 * MOCK_SEGMENT,
    table_addr: 0x1600,
    calibration_addr: 0x1800,
};

const MOCK_BASE: u32 = 0x1000;
const MOCK_LEN: usize = 0xA00;

/// NOR flash model with `SEGMENT`-byte erase segments.
pub struct MockFlash<const SEGMENT: u32 = MOCK_SEGMENT> {
    base: u32,
    mem: Vec<u8>,
    erases: Vec<u32>,
}

impl MockFlash {
    /// Fully erased device covering [`MOCK_LAYOUT`].
    pub fn new() -> Self {
        Self::with_region(MOCK_BASE, MOCK_LEN)
    }
}

impl<const SEGMENT: u32> MockFlash<SEGMENT> {
    /// Fully erased device covering `len` bytes from `base`.
    pub fn with_region(base: u32, len: usize) -> Self {
        Self {
            base,
            mem: std::vec![0xFF; len],
            erases: Vec::new(),
        }
    }

    fn range(&self, addr: u32, len: usize) -> Result<core::ops::Range<usize>, FlashError> {
        let start = addr.checked_sub(self.base).ok_or(FlashError::OutOfBounds)? as usize;
        let end = start + len;
        if end > self.mem.len() {
            return Err(FlashError::OutOfBounds);
        }
        Ok(start..end)
    }

    /// Number of erases of the segment at `addr`.
    pub fn erase_count(&self, addr: u32) -> usize {
        self.erases.iter().filter(|&&a| a == addr).count()
    }

    /// Raw device contents.
    pub fn bytes(&self, addr: u32, len: usize) -> &[u8] {
        match self.range(addr, len) {
            Ok(r) => &self.mem[r],
            Err(_) => &[],
        }
    }
}

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SEGMENT: u32> FlashMemory for MockFlash<SEGMENT> {
    const SEGMENT_SIZE: u32 = SEGMENT;

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let r = self.range(addr, buf.len())?;
        buf.copy_from_slice(&self.mem[r]);
        Ok(())
    }

    fn program(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashError> {
        let r = self.range(addr, data.len())?;
        for (cell, &b) in self.mem[r].iter_mut().zip(data) {
            *cell &= b;
        }
        Ok(())
    }

    fn erase_segment(&mut self, addr: u32) -> Result<(), FlashError> {
        if addr % SEGMENT != 0 {
            return Err(FlashError::Misaligned);
        }
        let r = self.range(addr, SEGMENT as usize)?;
        self.mem[r].fill(0xFF);
        self.erases.push(addr);
        Ok(())
    }
}

/// Empty shared store over a fresh [`MockFlash`].
pub fn shared_store() -> SharedStore<MockFlash> {
    Mutex::new(RefCell::new(FileStore::new(MockFlash::new(), MOCK_LAYOUT)))
}

/// When a scheduled event fires.
#[derive(Clone, Copy, Debug)]
pub enum At {
    /// On the n-th wait (1-based).
    Wait(u32),
    /// Once at least n telemetry lines have been sent.
    Lines(usize),
}

#[derive(Clone, Copy, Debug)]
pub enum SimEvent {
    /// Capture timer edge at the given counter value.
    Edge(u16),
    /// Capture timer overflow.
    Overflow,
    /// User button press.
    Button,
    /// Bytes arriving on the host link.
    Host(&'static [u8]),
}

pub struct MockBoard<'a> {
    ctx: &'a DeviceContext,
    store: &'a SharedStore<MockFlash>,
    receiver: CommandReceiver,

    events: VecDeque<(At, SimEvent)>,
    waits: u32,
    idle_waits: u32,
    stall_limit: u32,

    auto_echo: bool,
    echo_plan: VecDeque<Option<u16>>,
    default_echo: Option<u16>,
    echo_pending: bool,
    triggers: usize,

    light: [u16; 2],
    light_plan: VecDeque<u16>,
    adc_pending: Option<u16>,

    /// Everything sent to the host.
    pub tx: Vec<u8>,
    /// Every servo pulse width commanded.
    pub servo: Vec<u16>,
    /// Sum of all millisecond delays.
    pub delayed_ms: u64,
    /// Row 0 of the LCD captured at every millisecond delay.
    pub frames: Vec<String>,
    lcd: [[u8; LCD_COLS as usize]; LCD_ROWS as usize],
    cursor: (u8, u8),
    pub lcd_clears: usize,
}

impl<'a> MockBoard<'a> {
    pub fn new(ctx: &'a DeviceContext, store: &'a SharedStore<MockFlash>) -> Self {
        Self {
            ctx,
            store,
            receiver: CommandReceiver::new(),
            events: VecDeque::new(),
            waits: 0,
            idle_waits: 0,
            stall_limit: 10_000,
            auto_echo: true,
            echo_plan: VecDeque::new(),
            default_echo: Some(1_160),
            echo_pending: false,
            triggers: 0,
            light: [500, 500],
            light_plan: VecDeque::new(),
            adc_pending: None,
            tx: Vec::new(),
            servo: Vec::new(),
            delayed_ms: 0,
            frames: Vec::new(),
            lcd: [[b' '; LCD_COLS as usize]; LCD_ROWS as usize],
            cursor: (0, 0),
            lcd_clears: 0,
        }
    }

    /// Schedule an interrupt.
    pub fn at(mut self, at: At, event: SimEvent) -> Self {
        self.events.push_back((at, event));
        self
    }

    /// Host bytes delivered on the n-th wait.
    pub fn host(self, wait: u32, bytes: &'static [u8]) -> Self {
        self.at(At::Wait(wait), SimEvent::Host(bytes))
    }

    /// Echo width returned by every trigger without a planned result. `None` times out.
    pub fn echo(mut self, width: Option<u16>) -> Self {
        self.default_echo = width;
        self
    }

    /// Results of the next triggers, in order.
    pub fn echo_plan(mut self, plan: &[Option<u16>]) -> Self {
        self.echo_plan.extend(plan.iter().copied());
        self
    }

    /// Leave edges and overflows to scheduled events.
    pub fn manual_echo(mut self) -> Self {
        self.auto_echo = false;
        self
    }

    /// Values converted on the two light channels.
    pub fn light(mut self, a: u16, b: u16) -> Self {
        self.light = [a, b];
        self
    }

    /// Values of the next conversions on any channel, in order.
    pub fn light_plan(mut self, plan: &[u16]) -> Self {
        self.light_plan.extend(plan.iter().copied());
        self
    }

    pub fn stall_limit(mut self, waits: u32) -> Self {
        self.stall_limit = waits;
        self
    }

    /// Deliver host bytes right now, as if the RX interrupt fired.
    pub fn send_host(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.receiver.on_byte(b, self.ctx, self.store);
        }
    }

    #[inline]
    pub fn waits(&self) -> u32 {
        self.waits
    }

    #[inline]
    pub fn triggers(&self) -> usize {
        self.triggers
    }

    /// Telemetry lines sent so far, without terminators.
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.tx)
            .split_terminator("\r\n")
            .map(String::from)
            .collect()
    }

    fn line_count(&self) -> usize {
        self.tx.windows(2).filter(|w| *w == b"\r\n").count()
    }

    /// LCD row contents with trailing blanks removed.
    pub fn lcd_row(&self, row: usize) -> String {
        String::from_utf8_lossy(&self.lcd[row]).trim_end().into()
    }

    fn due_event(&mut self) -> Option<SimEvent> {
        let lines = self.line_count();
        let waits = self.waits;
        let pos = self.events.iter().position(|(at, _)| match *at {
            At::Wait(n) => waits >= n,
            At::Lines(n) => lines >= n,
        })?;
        self.events.remove(pos).map(|(_, e)| e)
    }

    fn deliver(&mut self, event: SimEvent) {
        match event {
            SimEvent::Edge(ts) => self.ctx.echo.on_capture(ts),
            SimEvent::Overflow => self.ctx.echo.on_overflow(),
            SimEvent::Button => self.ctx.press_button(),
            SimEvent::Host(bytes) => self.send_host(bytes),
        }
    }
}

impl IdleWait for MockBoard<'_> {
    fn wait_for_interrupt(&mut self) {
        self.waits += 1;

        if let Some(event) = self.due_event() {
            self.idle_waits = 0;
            self.deliver(event);
            return;
        }

        if let Some(value) = self.adc_pending.take() {
            self.idle_waits = 0;
            self.ctx.adc.on_conversion_complete(value);
            return;
        }

        if self.echo_pending {
            self.echo_pending = false;
            self.idle_waits = 0;
            match self.echo_plan.pop_front().unwrap_or(self.default_echo) {
                Some(width) => {
                    let rise = 64_000u16;
                    self.ctx.echo.on_capture(rise);
                    self.ctx.echo.on_capture(rise.wrapping_add(width));
                }
                None => self.ctx.echo.on_overflow(),
            }
            return;
        }

        self.idle_waits += 1;
        if self.idle_waits > self.stall_limit {
            panic!(
                "simulation stalled after {} waits ({} lines sent)",
                self.waits,
                self.line_count()
            );
        }
    }
}

impl SonarTrigger for MockBoard<'_> {
    fn arm_capture(&mut self) {
        self.echo_pending = false;
    }

    fn pulse_trigger(&mut self) {
        self.triggers += 1;
        self.echo_pending = self.auto_echo;
    }
}

impl LightAdc for MockBoard<'_> {
    fn start_conversion(&mut self, channel: u8) {
        let value = self.light_plan.pop_front().unwrap_or_else(|| {
            if channel == LIGHT_CHANNELS[0] {
                self.light[0]
            } else {
                self.light[1]
            }
        });
        self.adc_pending = Some(value);
    }
}

impl ServoOutput for MockBoard<'_> {
    fn set_pulse_us(&mut self, pulse_us: u16) {
        self.servo.push(pulse_us);
    }
}

impl HostLink for MockBoard<'_> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.tx.extend_from_slice(bytes);
    }
}

impl BusyDelay for MockBoard<'_> {
    fn delay_ms(&mut self, ms: u32) {
        self.delayed_ms += ms as u64;
        let frame = self.lcd_row(0);
        self.frames.push(frame);
    }

    fn delay_us(&mut self, _us: u32) {}
}

impl CharDisplay for MockBoard<'_> {
    fn clear(&mut self) {
        self.lcd = [[b' '; LCD_COLS as usize]; LCD_ROWS as usize];
        self.cursor = (0, 0);
        self.lcd_clears += 1;
    }

    fn set_cursor(&mut self, row: u8, col: u8) {
        self.cursor = (row.min(LCD_ROWS - 1), col);
    }

    fn write_byte(&mut self, byte: u8) {
        let (row, col) = self.cursor;
        if col < LCD_COLS {
            self.lcd[row as usize][col as usize] = byte;
        }
        self.cursor.1 = col.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::echo::Echo;
    use crate::Mode;

    #[test]
    fn flash_is_nor() {
        let mut f = MockFlash::new();
        f.program(0x1000, &[0x0F, 0xF0]).unwrap();
        f.program(0x1000, &[0xF3, 0xFF]).unwrap();
        assert_eq!(f.bytes(0x1000, 2), &[0x03, 0xF0]);

        f.erase_segment(0x1000).unwrap();
        assert_eq!(f.bytes(0x1000, 2), &[0xFF, 0xFF]);
        assert_eq!(f.erase_count(0x1000), 1);
        assert_eq!(f.erase_segment(0x1001), Err(FlashError::Misaligned));
        assert_eq!(f.program(0x0FFF, &[0]), Err(FlashError::OutOfBounds));
    }

    #[test]
    fn scripted_wrapping_edges_measure_correctly() {
        let ctx = DeviceContext::new();
        let store = shared_store();
        let mut board = MockBoard::new(&ctx, &store)
            .manual_echo()
            .at(At::Wait(1), SimEvent::Edge(65_000))
            .at(At::Wait(2), SimEvent::Edge(500));

        let echo = ctx.echo.trigger_and_measure(&mut board);
        assert_eq!(echo, Echo::Width((500u32 + 65_536 - 65_000) as u16));
    }

    #[test]
    fn scripted_overflow_is_timeout() {
        let ctx = DeviceContext::new();
        let store = shared_store();
        let mut board = MockBoard::new(&ctx, &store)
            .manual_echo()
            .at(At::Wait(1), SimEvent::Edge(100))
            .at(At::Wait(2), SimEvent::Overflow)
            .at(At::Wait(3), SimEvent::Edge(900));

        assert_eq!(ctx.echo.trigger_and_measure(&mut board).ticks(), 0);
    }

    #[test]
    fn host_bytes_reach_the_receiver() {
        let ctx = DeviceContext::new();
        let store = shared_store();
        let mut board = MockBoard::new(&ctx, &store).host(1, b"3");
        board.wait_for_interrupt();
        assert_eq!(ctx.mode(), Mode::LightScan);
    }

    #[test]
    #[should_panic(expected = "stalled")]
    fn stall_is_reported() {
        let ctx = DeviceContext::new();
        let store = shared_store();
        let mut board = MockBoard::new(&ctx, &store).stall_limit(3);
        board.wait_until(|| false);
    }
}
