// Copyright 2024 placer developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Macros

/// Creates a [`crate::core::errors::PlaceError`] of the given variant, wrapped into the crate's
/// `anyhow::Error` alias.
#[macro_export]
macro_rules! place_error {
    ($error_type:ident, $msg:expr) => {
        $crate::core::PlaceError::$error_type {
            text: $msg.to_string(),
        }
        .into()
    };
}

/// Creates a [`crate::core::errors::PlaceError`], wrapped in a closure for `.ok_or_else(...)`.
#[macro_export]
macro_rules! place_error_closure {
    ($error_type:ident, $msg:expr) => {
        || -> $crate::core::Error { $crate::place_error!($error_type, $msg) }
    };
}

/// Asserts that expression `$n` is an `Err` downcasting to `$t` with display text `$s`.
#[cfg(test)]
#[macro_export]
macro_rules! assert_error {
    ($n:expr, $t:ty, $s:expr) => {
        assert_eq!(
            $n.err().unwrap().downcast_ref::<$t>().unwrap().to_string(),
            $s
        );
    };
}
