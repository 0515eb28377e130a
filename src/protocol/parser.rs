// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Host command receiver.
//!
//! [`Parser`] is a pure byte-at-a-time state machine: it filters the input, accumulates fields in
//! a fixed line buffer and yields a [`Command`] whenever a request is complete. The states nest
//! the way the menus do:
//!
//! ```text
//! SelectMode ──2──► GetDegree ──\n──► SelectMode
//!     │
//!     5
//!     ▼
//! FlashMenu(SelectOp) ──r/e──► Reading / Executing ──\n──► SelectOp
//!     │
//!     w
//!     ▼
//! Writing(WaitName ─► WaitType ─► WaitSize ─► WaitContent) ──+──► SelectOp
//! ```
//!
//! [`CommandReceiver`] wraps the parser and applies each command to the shared device state and
//! the file store. It runs in the host link RX interrupt and never blocks.

use heapless::Vec;

use crate::config::{MAX_ANGLE_DEG, MAX_FILE_SIZE, RX_BUF_SIZE};
use crate::context::{DeviceContext, Mode};
use crate::protocol::messages::*;
use crate::storage::{with_store, FileKind, FlashMemory, SharedStore};

/// Top level of the receiver FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainState {
    SelectMode,
    GetDegree,
    FlashMenu(FlashOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    SelectOp,
    Reading,
    Executing,
    Writing(WriteStage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    WaitName,
    WaitType,
    WaitSize,
    WaitContent,
}

/// How the current field ended.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldEnd {
    Line,
    Eof,
    Full,
}

pub struct Parser {
    state: MainState,
    line: Vec<u8, RX_BUF_SIZE>,
    /// The line buffer holds a field already handed out and is cleared on the next byte.
    consumed: bool,
    expected: u16,
    received: u16,
}

impl Parser {
    pub const fn new() -> Self {
        Self {
            state: MainState::SelectMode,
            line: Vec::new(),
            consumed: false,
            expected: 0,
            received: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> MainState {
        self.state
    }

    /// Bytes of file content accepted since the size field.
    #[inline]
    pub fn received(&self) -> u16 {
        self.received
    }

    /// Declared (clamped) size of the file being written.
    #[inline]
    pub fn expected(&self) -> u16 {
        self.expected
    }

    /// Process one received byte. Returns a command when a request completes.
    pub fn push(&mut self, byte: u8) -> Option<Command<'_>> {
        if self.consumed {
            self.line.clear();
            self.consumed = false;
        }
        if !is_accepted(byte) {
            return None;
        }

        match self.state {
            MainState::SelectMode => self.select_mode(byte),
            MainState::FlashMenu(FlashOp::SelectOp) => self.select_op(byte),
            _ => match self.accumulate(byte) {
                Some(end) => {
                    self.consumed = true;
                    self.complete_field(end)
                }
                None => None,
            },
        }
    }

    fn select_mode(&mut self, byte: u8) -> Option<Command<'_>> {
        match byte {
            CMD_TELEMETER => {
                self.state = MainState::GetDegree;
                None
            }
            CMD_FLASH_MENU => {
                self.state = MainState::FlashMenu(FlashOp::SelectOp);
                None
            }
            _ => mode_for(byte).map(Command::SetMode),
        }
    }

    fn select_op(&mut self, byte: u8) -> Option<Command<'_>> {
        match byte {
            OP_READ => {
                self.state = MainState::FlashMenu(FlashOp::Reading);
                None
            }
            OP_EXECUTE => {
                self.state = MainState::FlashMenu(FlashOp::Executing);
                None
            }
            OP_WRITE => {
                self.state = MainState::FlashMenu(FlashOp::Writing(WriteStage::WaitName));
                Some(Command::SetMode(Mode::Idle))
            }
            _ => {
                self.state = MainState::SelectMode;
                Some(Command::SetMode(Mode::Idle))
            }
        }
    }

    /// Add `byte` to the current field. Returns how the field ended once it is complete.
    fn accumulate(&mut self, byte: u8) -> Option<FieldEnd> {
        let in_content = matches!(
            self.state,
            MainState::FlashMenu(FlashOp::Writing(WriteStage::WaitContent))
        );

        if byte == LINE_END {
            return Some(FieldEnd::Line);
        }
        if byte == EOF_MARKER && in_content {
            return Some(FieldEnd::Eof);
        }

        let _ = self.line.push(byte);
        if self.line.is_full() {
            Some(FieldEnd::Full)
        } else {
            None
        }
    }

    fn complete_field(&mut self, end: FieldEnd) -> Option<Command<'_>> {
        match self.state {
            MainState::GetDegree => {
                self.state = MainState::SelectMode;
                let deg = parse_decimal(&self.line);
                if deg > MAX_ANGLE_DEG {
                    log_warn!("telemeter angle {} clamped", deg);
                }
                Some(Command::Telemeter(deg.min(MAX_ANGLE_DEG)))
            }
            MainState::FlashMenu(FlashOp::Reading) => {
                self.state = MainState::FlashMenu(FlashOp::SelectOp);
                Some(Command::Browse(parse_decimal(&self.line).min(u8::MAX as u16) as u8))
            }
            MainState::FlashMenu(FlashOp::Executing) => {
                self.state = MainState::FlashMenu(FlashOp::SelectOp);
                Some(Command::Execute(parse_decimal(&self.line).min(u8::MAX as u16) as u8))
            }
            MainState::FlashMenu(FlashOp::Writing(stage)) => self.write_field(stage, end),
            // Opcode states never accumulate.
            MainState::SelectMode | MainState::FlashMenu(FlashOp::SelectOp) => None,
        }
    }

    fn write_field(&mut self, stage: WriteStage, end: FieldEnd) -> Option<Command<'_>> {
        let next = |s| MainState::FlashMenu(FlashOp::Writing(s));

        match stage {
            WriteStage::WaitName => {
                self.state = next(WriteStage::WaitType);
                Some(Command::FileName(&self.line[..]))
            }
            WriteStage::WaitType => {
                self.state = next(WriteStage::WaitSize);
                let kind = match self.line.first() {
                    Some(&KIND_TEXT) => FileKind::Text,
                    _ => FileKind::Script,
                };
                Some(Command::FileType(kind))
            }
            WriteStage::WaitSize => {
                self.state = next(WriteStage::WaitContent);
                let size = parse_decimal(&self.line);
                if size > MAX_FILE_SIZE {
                    log_warn!("file size {} clamped to {}", size, MAX_FILE_SIZE);
                }
                self.expected = size.min(MAX_FILE_SIZE);
                self.received = 0;
                Some(Command::FileSize(self.expected))
            }
            WriteStage::WaitContent => {
                let room = (self.expected - self.received) as usize;
                let len = self.line.len().min(room);
                self.received += len as u16;

                let chunk = &self.line[..len];
                if end == FieldEnd::Eof {
                    self.state = MainState::FlashMenu(FlashOp::SelectOp);
                    Some(Command::FileEnd(chunk))
                } else {
                    Some(Command::FileChunk(chunk))
                }
            }
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parser plus the side effects of each command.
pub struct CommandReceiver {
    parser: Parser,
    /// Slot of the upload in progress, `None` if it was rejected.
    slot: Option<usize>,
}

impl CommandReceiver {
    pub const fn new() -> Self {
        Self {
            parser: Parser::new(),
            slot: None,
        }
    }

    #[inline]
    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Host link RX interrupt body.
    pub fn on_byte<F: FlashMemory>(&mut self, byte: u8, ctx: &DeviceContext, store: &SharedStore<F>) {
        let Some(cmd) = self.parser.push(byte) else {
            return;
        };

        match cmd {
            Command::SetMode(mode) => {
                log_info!("host: mode {:?}", mode);
                ctx.set_mode(mode);
            }
            Command::Telemeter(deg) => {
                log_info!("host: telemeter at {}", deg);
                ctx.request_telemeter(deg);
            }
            Command::Browse(index) => {
                if with_store(store, |s| s.entry(index as usize).is_some()) {
                    ctx.select_file(index, Mode::FileBrowse);
                } else {
                    log_warn!("host: no file {} to browse", index);
                }
            }
            Command::Execute(index) => {
                let kind = with_store(store, |s| s.entry(index as usize).map(|e| e.kind));
                match kind {
                    Some(FileKind::Script) => ctx.select_file(index, Mode::ScriptExecute),
                    Some(FileKind::Text) => log_warn!("host: file {} is not a script", index),
                    None => log_warn!("host: no file {} to execute", index),
                }
            }
            Command::FileName(name) => {
                let created = with_store(store, |s| {
                    let index = s.next_slot();
                    s.create(index, name).map(|_| index)
                });
                self.slot = match created {
                    Ok(index) => Some(index),
                    Err(e) => {
                        log_error!("upload rejected: {:?}", e);
                        None
                    }
                };
            }
            Command::FileType(kind) => {
                if let Some(index) = self.slot {
                    if let Err(e) = with_store(store, |s| s.set_kind(index, kind)) {
                        log_error!("upload rejected: {:?}", e);
                        self.slot = None;
                    }
                }
            }
            Command::FileSize(size) => {
                if let Some(index) = self.slot {
                    if let Err(e) = with_store(store, |s| s.reserve(index, size)) {
                        log_error!("upload rejected: {:?}", e);
                        self.slot = None;
                    }
                }
            }
            Command::FileChunk(bytes) => {
                if let Some(index) = self.slot {
                    if let Err(e) = with_store(store, |s| s.append(index, bytes)) {
                        log_error!("file {}: write failed: {:?}", index, e);
                    }
                }
            }
            Command::FileEnd(bytes) => {
                if let Some(index) = self.slot.take() {
                    let result = with_store(store, |s| {
                        s.append(index, bytes)?;
                        s.finalize(index)
                    });
                    if let Err(e) = result {
                        log_error!("file {}: finalize failed: {:?}", index, e);
                    }
                }
            }
        }
    }
}

impl Default for CommandReceiver {
    fn default() -> Self {
        Self::new()
    }
}
