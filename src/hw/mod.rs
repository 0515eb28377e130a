// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Hardware layer.
//!
//! | Module    | Build      | Contents                                      |
//! |-----------|------------|-----------------------------------------------|
//! | `traits`  | always     | services the firmware core calls into         |
//! | `mock`    | tests      | simulated board and NOR flash                 |
//! | `usart`   | `board`    | USART3 host link                              |
//! | `adc`     | `board`    | ADC1 light sensor conversions                 |
//! | `capture` | `board`    | TIM3 echo capture                             |
//! | `pwm`     | `board`    | TIM4 servo output                             |
//! | `flash`   | `board`    | internal flash sectors                        |
//! | `lcd`     | `board`    | HD44780 display                               |
//! | `board`   | `board`    | pin map and the `Board` implementation        |

pub mod traits;

#[cfg(test)]
pub mod mock;

#[cfg(feature = "board")]
pub mod adc;
#[cfg(feature = "board")]
pub mod board;
#[cfg(feature = "board")]
pub mod capture;
#[cfg(feature = "board")]
pub mod flash;
#[cfg(feature = "board")]
pub mod lcd;
#[cfg(feature = "board")]
pub mod pwm;
#[cfg(feature = "board")]
pub mod usart;

#[cfg(feature = "board")]
pub use board::Stm32Board;
#[cfg(feature = "board")]
pub use flash::InternalFlash;
