// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Outbound telemetry lines: decimal fields joined by `:` and terminated by CRLF.
//!
//! ```text
//! 12:1160        angle and echo ticks (object scan, telemeter)
//! 12:845         angle and light (light scan) or slot and value (calibration replay)
//! 12:1160:845    angle, echo ticks and light (combined scan)
//! 6:3 / 6:DONE   calibration progress
//! ```

use heapless::Vec;

use crate::hw::traits::HostLink;
use crate::protocol::messages::{CALIBRATION_DONE, CALIBRATION_TAG};

const LINE_CAP: usize = 48;

/// One line under construction.
pub struct Line {
    buf: Vec<u8, LINE_CAP>,
}

impl Line {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn separator(&mut self) {
        if !self.buf.is_empty() {
            let _ = self.buf.push(b':');
        }
    }

    /// Append a decimal field.
    pub fn num(mut self, value: u32) -> Self {
        self.separator();
        let mut fmt = itoa::Buffer::new();
        let _ = self.buf.extend_from_slice(fmt.format(value).as_bytes());
        self
    }

    /// Append a literal field.
    pub fn text(mut self, s: &str) -> Self {
        self.separator();
        let _ = self.buf.extend_from_slice(s.as_bytes());
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Terminate and transmit.
    pub fn send<H: HostLink>(self, link: &mut H) {
        link.write_bytes(&self.buf);
        link.write_bytes(b"\r\n");
    }
}

impl Default for Line {
    fn default() -> Self {
        Self::new()
    }
}

/// `<a>:<b>`
pub fn send_pair<H: HostLink>(link: &mut H, a: u32, b: u32) {
    Line::new().num(a).num(b).send(link);
}

/// `<a>:<b>:<c>`
pub fn send_triple<H: HostLink>(link: &mut H, a: u32, b: u32, c: u32) {
    Line::new().num(a).num(b).num(c).send(link);
}

/// `6:<slot>`
pub fn send_calibration_step<H: HostLink>(link: &mut H, slot: u32) {
    send_pair(link, CALIBRATION_TAG, slot);
}

/// `6:DONE`
pub fn send_calibration_done<H: HostLink>(link: &mut H) {
    Line::new().num(CALIBRATION_TAG).text(CALIBRATION_DONE).send(link);
}
