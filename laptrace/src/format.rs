// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The duration formatting capability used when laps are rendered.
//!
//! A formatter is a pure function from a [`Duration`] to its display string.
//! Every [`crate::Stopwatch`] is constructed with [`default_formatter`]
//! already installed, so there is never an absent-formatter state to handle
//! at render time; [`crate::Stopwatch::set_formatter`] replaces it.

use std::{sync::Arc, time::Duration};

/// Shared duration-to-string function applied when a lap is rendered.
///
/// Formatters must be pure: they are called outside the stopwatch's
/// internal lock and must not call back into the stopwatch.
pub type Formatter = Arc<dyn Fn(Duration) -> String + Send + Sync>;

/// The formatter installed at construction: [`Duration`]'s standard textual
/// form (its `Debug` rendering, e.g. `100ms`, `1.5s`, `3723.004s`).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use laptrace::default_formatter;
///
/// let format = default_formatter();
/// assert_eq!(format(Duration::from_millis(100)), "100ms");
/// assert_eq!(format(Duration::from_millis(1500)), "1.5s");
/// ```
pub fn default_formatter() -> Formatter {
    Arc::new(|duration| format!("{duration:?}"))
}
