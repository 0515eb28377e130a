// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Logging macros.
//!
//! - Firmware with the `defmt` feature: forwarded to `defmt` (RTT transport).
//! - Host tests: printed with a level prefix.
//! - Anything else: arguments are evaluated but nothing is emitted.
//!
//! Format strings must stay within the subset shared by `core::fmt` and `defmt` (plain `{}` and
//! `{:?}` placeholders).

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::error!($($arg)*);

        #[cfg(all(test, not(feature = "defmt")))]
        std::eprintln!("[ERROR] {}", format_args!($($arg)*));

        #[cfg(not(any(test, feature = "defmt")))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(test, not(feature = "defmt")))]
        std::println!("[WARN] {}", format_args!($($arg)*));

        #[cfg(not(any(test, feature = "defmt")))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log info message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::info!($($arg)*);

        #[cfg(all(test, not(feature = "defmt")))]
        std::println!("[INFO] {}", format_args!($($arg)*));

        #[cfg(not(any(test, feature = "defmt")))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(test, not(feature = "defmt")))]
        std::println!("[DEBUG] {}", format_args!($($arg)*));

        #[cfg(not(any(test, feature = "defmt")))]
        let _ = format_args!($($arg)*);
    }};
}
