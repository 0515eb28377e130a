// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Hobby servo angle mapping.
//!
//! The servo expects a 20 ms frame whose high time encodes the angle: 600 µs at 0° plus 10 µs
//! per degree.

use crate::config::{MAX_ANGLE_DEG, SERVO_MIN_PULSE_US, SERVO_US_PER_DEG};
use crate::hw::traits::ServoOutput;

/// High time for `deg`, clamped to the servo's range.
#[inline]
pub const fn pulse_for_angle(deg: u16) -> u16 {
    let deg = if deg > MAX_ANGLE_DEG { MAX_ANGLE_DEG } else { deg };
    SERVO_MIN_PULSE_US + SERVO_US_PER_DEG * deg
}

/// Drive the servo to `deg`. Returns the angle actually commanded.
pub fn aim<S: ServoOutput>(servo: &mut S, deg: u16) -> u16 {
    let deg = deg.min(MAX_ANGLE_DEG);
    servo.set_pulse_us(pulse_for_angle(deg));
    deg
}
