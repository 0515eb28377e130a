// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Sensor and Actuator Drivers
//!
//! Device logic that sits above the `hw/` service traits and below the mode routines.
//!
//! - [`echo`] – HC-SR04 style ultrasonic echo capture with overflow timeout
//! - [`light`] – two-tap LDR light sampler on the ADC
//! - [`servo`] – angle to pulse-width mapping for the scan servo

pub mod echo;
pub mod light;
pub mod servo;

pub use echo::{Echo, EchoCapture};
pub use light::AdcConversion;
