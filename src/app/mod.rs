// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Application Layer
//!
//! The main-loop side of the firmware: the mode dispatcher and the routines it runs.
//!
//! - [`dispatcher`] – reads the shared mode and runs one routine per pass
//! - [`scan`] – object, light and combined sweeps plus the fixed-angle telemeter
//! - [`calibrate`] – button-driven light calibration
//! - [`browse`] – paging a stored file on the LCD
//! - [`script`] – stored script decoder and interpreter

pub mod browse;
pub mod calibrate;
pub mod dispatcher;
pub mod scan;
pub mod script;

pub use dispatcher::Dispatcher;
