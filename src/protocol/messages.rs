// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Host link protocol.
//!
//! Inbound traffic is single-character opcodes plus `\n`-terminated ASCII fields; file content
//! ends with `+`. Outbound traffic is `:`-separated decimal telemetry lines (see
//! [`crate::protocol::telemetry`]).

use crate::context::Mode;
use crate::storage::FileKind;

// Main menu opcodes
pub const CMD_OBJECT_SCAN: u8 = b'1';
pub const CMD_TELEMETER: u8 = b'2';
pub const CMD_LIGHT_SCAN: u8 = b'3';
pub const CMD_OBJECT_LIGHT_SCAN: u8 = b'4';
pub const CMD_FLASH_MENU: u8 = b'5';
pub const CMD_CALIBRATE: u8 = b'6';
pub const CMD_IDLE: u8 = b'8';

// Flash menu opcodes
pub const OP_READ: u8 = b'r';
pub const OP_EXECUTE: u8 = b'e';
pub const OP_WRITE: u8 = b'w';
pub const OP_EXIT: u8 = b'8';

/// Field terminator.
pub const LINE_END: u8 = b'\n';
/// End of file content.
pub const EOF_MARKER: u8 = b'+';
/// File type field value for text files; anything else is a script.
pub const KIND_TEXT: u8 = b'1';

/// Tag of calibration progress lines (`6:<slot>`, `6:DONE`).
pub const CALIBRATION_TAG: u32 = 6;
pub const CALIBRATION_DONE: &str = "DONE";

/// Bytes the receiver keeps; everything else is dropped on arrival.
#[inline]
pub fn is_accepted(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7E) || byte == LINE_END
}

/// Mode selected by a single main-menu opcode, if it is one.
pub fn mode_for(byte: u8) -> Option<Mode> {
    match byte {
        CMD_OBJECT_SCAN => Some(Mode::ObjectScan),
        CMD_LIGHT_SCAN => Some(Mode::LightScan),
        CMD_OBJECT_LIGHT_SCAN => Some(Mode::ObjectLightScan),
        CMD_CALIBRATE => Some(Mode::Calibrate),
        CMD_IDLE => Some(Mode::Idle),
        _ => None,
    }
}

/// Decoded host request. Byte slices borrow the receiver's line buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    SetMode(Mode),
    Telemeter(u16),
    Browse(u8),
    Execute(u8),
    FileName(&'a [u8]),
    FileType(FileKind),
    FileSize(u16),
    FileChunk(&'a [u8]),
    FileEnd(&'a [u8]),
}

/// Leading ASCII decimal digits of `field`, saturating. Anything else parses as 0.
pub fn parse_decimal(field: &[u8]) -> u16 {
    field
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0u16, |acc, &b| acc.saturating_mul(10).saturating_add((b - b'0') as u16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_fields() {
        assert_eq!(parse_decimal(b"45"), 45);
        assert_eq!(parse_decimal(b"007"), 7);
        assert_eq!(parse_decimal(b"12ab"), 12);
        assert_eq!(parse_decimal(b"abc"), 0);
        assert_eq!(parse_decimal(b""), 0);
        assert_eq!(parse_decimal(b"9999999"), u16::MAX);
    }

    #[test]
    fn filter_keeps_printable_and_newline() {
        assert!(is_accepted(b'a'));
        assert!(is_accepted(b' '));
        assert!(is_accepted(b'~'));
        assert!(is_accepted(EOF_MARKER));
        assert!(is_accepted(LINE_END));
        assert!(!is_accepted(b'\r'));
        assert!(!is_accepted(0x01));
        assert!(!is_accepted(0x7F));
        assert!(!is_accepted(0xFF));
    }
}
