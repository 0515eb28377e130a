// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # sonar-scope Firmware
//!
//! Firmware for a servo-mounted ultrasonic rangefinder and light sensor with a UART host link, a
//! character LCD and an on-chip flash file store for scripted sequences. Targets an STM32F767
//! MCU; everything above the `hw` register layer builds and tests on the host.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`hw`] | Black-box hardware service traits, STM32F7 implementations, test mock |
//! | [`drivers`] | Echo capture, light sampler, servo angle mapping |
//! | [`protocol`] | Host command receiver FSM and telemetry line format |
//! | [`storage`] | Flash file store and calibration table |
//! | [`app`] | Top-level mode dispatcher and mode routines |
//! | [`context`] | State shared between interrupt handlers and the main loop |
//!
//! ## Getting Started
//!
//! Run the host test suite:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release --features board --target thumbv7em-none-eabihf
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

#[macro_use]
pub mod logging;

pub mod app;
pub mod config;
pub mod context;
pub mod drivers;
pub mod error;
pub mod hw;
pub mod protocol;
pub mod storage;

pub use context::{DeviceContext, Mode};
pub use error::{Error, Result};
