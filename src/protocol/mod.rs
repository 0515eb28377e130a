// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Host link protocol: inbound command FSM and outbound telemetry.

pub mod messages;
pub mod parser;
pub mod telemetry;

pub use messages::Command;
pub use parser::{CommandReceiver, Parser};
