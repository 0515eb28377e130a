// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Stored script interpreter.
//!
//! Scripts are ASCII hex, two digits per byte; spaces are ignored. Each instruction is an opcode
//! byte followed by its operands:
//!
//! | Opcode | Operands | Effect |
//! | ------ | -------- | ------ |
//! | `01` | `x` | count 0..=x on the LCD |
//! | `02` | `x` | count x..=0 on the LCD |
//! | `03` | `c` | move character `c` right across all LCD cells |
//! | `04` | `d` | set the step delay to `d` × 10 ms |
//! | `05` | | clear the LCD |
//! | `06` | `p` | aim at `p`°, measure, send `<p>:<ticks>` |
//! | `07` | `l r` | sweep `l`°..=`r`°, sending `<a>:<ticks>` per angle |
//! | `08` | | stop |
//!
//! Decoding is lazy: instructions before a malformed one still run.

use crate::config::{ScanTiming, LCD_COLS, LCD_ROWS};
use crate::context::{DeviceContext, Mode};
use crate::drivers::servo;
use crate::error::{Result, ScriptError};
use crate::hw::traits::Board;
use crate::protocol::telemetry::send_pair;

pub const OP_INC_LCD: u8 = 0x01;
pub const OP_DEC_LCD: u8 = 0x02;
pub const OP_RRA_LCD: u8 = 0x03;
pub const OP_SET_DELAY: u8 = 0x04;
pub const OP_CLEAR_LCD: u8 = 0x05;
pub const OP_SERVO_DEG: u8 = 0x06;
pub const OP_SERVO_SCAN: u8 = 0x07;
pub const OP_SLEEP: u8 = 0x08;

/// Step delay unit of `set_delay`, in milliseconds.
const DELAY_UNIT_MS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    IncLcd(u8),
    DecLcd(u8),
    RraLcd(u8),
    SetDelay(u8),
    ClearLcd,
    ServoDeg(u8),
    ServoScan { from: u8, to: u8 },
    Sleep,
}

/// Iterator over the instructions of a hex script. Ends after the first error.
pub struct Decoder<'a> {
    hex: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(hex: &'a [u8]) -> Self {
        Self { hex }
    }

    fn nibble(c: u8) -> core::result::Result<u8, ScriptError> {
        match c {
            b'0'..=b'9' => Ok(c - b'0'),
            b'a'..=b'f' => Ok(c - b'a' + 10),
            b'A'..=b'F' => Ok(c - b'A' + 10),
            _ => Err(ScriptError::BadHex),
        }
    }

    /// Next encoded byte, `None` at the end of the script.
    fn byte(&mut self) -> core::result::Result<Option<u8>, ScriptError> {
        while let [b' ', rest @ ..] = self.hex {
            self.hex = rest;
        }
        match self.hex {
            [] => Ok(None),
            [hi, lo, rest @ ..] => {
                let b = Self::nibble(*hi)? << 4 | Self::nibble(*lo)?;
                self.hex = rest;
                Ok(Some(b))
            }
            [_] => Err(ScriptError::Truncated),
        }
    }

    fn operand(&mut self) -> core::result::Result<u8, ScriptError> {
        self.byte()?.ok_or(ScriptError::Truncated)
    }

    fn instruction(&mut self) -> core::result::Result<Option<Instruction>, ScriptError> {
        let Some(op) = self.byte()? else {
            return Ok(None);
        };

        let ins = match op {
            OP_INC_LCD => Instruction::IncLcd(self.operand()?),
            OP_DEC_LCD => Instruction::DecLcd(self.operand()?),
            OP_RRA_LCD => Instruction::RraLcd(self.operand()?),
            OP_SET_DELAY => Instruction::SetDelay(self.operand()?),
            OP_CLEAR_LCD => Instruction::ClearLcd,
            OP_SERVO_DEG => Instruction::ServoDeg(self.operand()?),
            OP_SERVO_SCAN => Instruction::ServoScan {
                from: self.operand()?,
                to: self.operand()?,
            },
            OP_SLEEP => Instruction::Sleep,
            other => return Err(ScriptError::UnknownOpcode(other)),
        };
        Ok(Some(ins))
    }
}

impl Iterator for Decoder<'_> {
    type Item = core::result::Result<Instruction, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.instruction() {
            Ok(ins) => ins.map(Ok),
            Err(e) => {
                self.hex = &[];
                Some(Err(e))
            }
        }
    }
}

/// Runs one script against the board.
pub struct Interpreter<'a> {
    ctx: &'a DeviceContext,
    timing: &'a ScanTiming,
    delay_ms: u32,
}

impl<'a> Interpreter<'a> {
    pub fn new(ctx: &'a DeviceContext, timing: &'a ScanTiming) -> Self {
        Self {
            ctx,
            timing,
            delay_ms: timing.script_default_delay_ms,
        }
    }

    #[inline]
    fn running(&self) -> bool {
        self.ctx.mode() == Mode::ScriptExecute
    }

    /// Execute `script` until `sleep`, the end of the script or a mode change.
    pub fn run<B: Board>(&mut self, board: &mut B, script: &[u8]) -> Result<()> {
        for ins in Decoder::new(script) {
            if !self.running() {
                log_info!("script aborted");
                return Ok(());
            }

            match ins? {
                Instruction::IncLcd(x) => self.count(board, (0..=x).map(u32::from)),
                Instruction::DecLcd(x) => self.count(board, (0..=x).rev().map(u32::from)),
                Instruction::RraLcd(c) => self.rotate(board, c),
                Instruction::SetDelay(d) => self.delay_ms = d as u32 * DELAY_UNIT_MS,
                Instruction::ClearLcd => board.clear(),
                Instruction::ServoDeg(p) => {
                    let angle = servo::aim(board, p as u16);
                    board.delay_ms(self.timing.sweep_settle_ms);
                    let echo = self.ctx.echo.trigger_and_measure(board);
                    send_pair(board, angle as u32, echo.ticks() as u32);
                }
                Instruction::ServoScan { from, to } => self.scan(board, from, to),
                Instruction::Sleep => break,
            }
        }
        Ok(())
    }

    fn count<B: Board>(&mut self, board: &mut B, values: impl Iterator<Item = u32>) {
        let mut digits = itoa::Buffer::new();
        for n in values {
            if !self.running() {
                return;
            }
            board.clear();
            board.set_cursor(0, 0);
            board.write_str(digits.format(n));
            board.delay_ms(self.delay_ms);
        }
    }

    fn rotate<B: Board>(&mut self, board: &mut B, c: u8) {
        for cell in 0..LCD_ROWS * LCD_COLS {
            if !self.running() {
                return;
            }
            board.clear();
            board.set_cursor(cell / LCD_COLS, cell % LCD_COLS);
            board.write_byte(c);
            board.delay_ms(self.delay_ms);
        }
    }

    fn scan<B: Board>(&mut self, board: &mut B, from: u8, to: u8) {
        let step: i16 = if from <= to { 1 } else { -1 };
        let mut angle = from as i16;

        servo::aim(board, from as u16);
        board.delay_ms(self.timing.sweep_settle_ms);

        loop {
            if !self.running() {
                return;
            }
            let commanded = servo::aim(board, angle as u16);
            board.delay_ms(self.timing.echo_step_ms);
            let echo = self.ctx.echo.trigger_and_measure(board);
            send_pair(board, commanded as u32, echo.ticks() as u32);

            if angle == to as i16 {
                return;
            }
            angle += step;
        }
    }
}
