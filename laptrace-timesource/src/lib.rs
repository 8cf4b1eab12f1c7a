// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use std::{cell::RefCell, fmt::Debug, sync::Arc, time::Instant};

/// Module containing fake clocks for testing
///
/// To enable this module, you must enable the `test-util` feature.
#[cfg(feature = "test-util")]
pub mod fakes;

/// Trait for providing custom monotonic clocks
///
/// Implementors of this trait can be used to provide custom time behavior
/// for testing or specialized use cases. Readings are expected to be
/// monotonic; a clock that goes backwards is treated as an anomaly by
/// consumers of this crate.
pub trait Time: Send + Sync + Debug {
    /// Get the current monotonic reading
    fn now(&self) -> Instant;
}

/// Tokio-specific clock integration
///
/// This module reads the clock through tokio's time utilities, including
/// support for tokio's time pause/advance functionality for testing.
///
/// This requires that the `tokio` feature be enabled.
#[cfg(feature = "tokio")]
pub mod tokio {
    use std::time::Instant;

    use tokio::time::Instant as TokioInstant;

    use crate::{Time, TimeSource};

    impl TimeSource {
        /// Create a new TimeSource that reads tokio's clock
        ///
        /// This allows integration with tokio's time pause/advance
        /// functionality for testing time-dependent code.
        ///
        /// This requires that the `tokio` feature be enabled.
        ///
        /// # Examples
        ///
        /// ```
        /// # #[tokio::main(flavor = "current_thread")]
        /// # async fn main() {
        /// use std::time::Duration;
        /// use laptrace_timesource::TimeSource;
        ///
        /// tokio::time::pause();
        /// let ts = TimeSource::tokio();
        /// let start = ts.now();
        ///
        /// tokio::time::advance(Duration::from_secs(5)).await;
        /// assert_eq!(ts.now() - start, Duration::from_secs(5));
        /// # }
        /// ```
        pub fn tokio() -> Self {
            TimeSource::custom(TokioClock)
        }
    }

    /// A clock that reads tokio's time utilities
    ///
    /// This clock integrates with tokio's time pause/advance functionality,
    /// making it useful for testing time-dependent code.
    ///
    /// This requires that the `tokio` feature be enabled.
    #[derive(Copy, Clone, Debug)]
    pub struct TokioClock;

    impl Time for TokioClock {
        fn now(&self) -> Instant {
            TokioInstant::now().into_std()
        }
    }

}

/// Enum representing different clock options
///
/// TimeSource provides a unified interface for reading the monotonic clock,
/// whether from the system or from a custom clock for testing.
#[derive(Clone, Default)]
pub enum TimeSource {
    /// Use the system clock
    #[default]
    System,
    /// Use a custom clock
    Custom(Arc<dyn Time>),
}

impl Debug for TimeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "TimeSource::System"),
            Self::Custom(_) => write!(f, "TimeSource::Custom(...)"),
        }
    }
}

impl TimeSource {
    /// Get the current [`Instant`] from this clock
    ///
    /// # Examples
    ///
    /// ```
    /// use laptrace_timesource::TimeSource;
    ///
    /// let ts = TimeSource::System;
    /// let start = ts.now();
    /// // Do some work
    /// let elapsed = ts.now() - start;
    /// ```
    pub fn now(&self) -> Instant {
        match self {
            Self::System => Instant::now(),
            Self::Custom(clock) => clock.now(),
        }
    }

    /// Create a new TimeSource with a custom clock implementation
    ///
    /// # Examples
    ///
    /// ```
    /// use laptrace_timesource::{TimeSource, fakes::ManualClock};
    /// use std::time::Duration;
    ///
    /// let clock = ManualClock::starting_now();
    /// let ts = TimeSource::custom(clock.clone());
    ///
    /// let start = ts.now();
    /// clock.advance(Duration::from_secs(100));
    /// assert_eq!(ts.now() - start, Duration::from_secs(100));
    /// ```
    pub fn custom(clock: impl Time + 'static) -> TimeSource {
        Self::Custom(Arc::new(clock))
    }
}

// Thread-local clock override
thread_local! {
    static THREAD_LOCAL_TIME_SOURCE: RefCell<Option<TimeSource>> = const { RefCell::new(None) };
}

/// Guard for thread-local clock override
#[must_use]
pub struct ThreadLocalTimeSourceGuard {
    previous: Option<TimeSource>,
}

impl Drop for ThreadLocalTimeSourceGuard {
    fn drop(&mut self) {
        THREAD_LOCAL_TIME_SOURCE.with(|cell| {
            *cell.borrow_mut() = self.previous.take();
        });
    }
}

/// Set a thread-local clock override and return a guard
///
/// When the guard is dropped, the thread-local override will be cleared.
///
/// # Examples
/// ```
/// use laptrace_timesource::{TimeSource, fakes::ManualClock, set_time_source, time_source};
/// use std::time::Duration;
///
/// let clock = ManualClock::starting_now();
/// let _guard = set_time_source(TimeSource::custom(clock.clone()));
///
/// let start = time_source().now();
/// clock.advance(Duration::from_secs(30));
/// assert_eq!(time_source().now() - start, Duration::from_secs(30));
/// ```
pub fn set_time_source(time_source: TimeSource) -> ThreadLocalTimeSourceGuard {
    let previous = THREAD_LOCAL_TIME_SOURCE.with(|cell| cell.borrow_mut().replace(time_source));
    ThreadLocalTimeSourceGuard { previous }
}

/// Run a closure with a thread-local clock override
pub fn with_time_source<F, R>(time_source: TimeSource, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = set_time_source(time_source);
    f()
}

/// Get the current clock, following the priority order:
/// 1. Explicitly provided clock
/// 2. Thread-local override
/// 3. System default
#[inline]
pub fn get_time_source(ts: Option<TimeSource>) -> TimeSource {
    // 1. Explicitly provided clock
    if let Some(ts) = ts {
        return ts;
    }

    // 2. Thread-local override
    let thread_local = THREAD_LOCAL_TIME_SOURCE.with(|cell| cell.borrow().clone());
    if let Some(ts) = thread_local {
        return ts;
    }

    // 3. System default
    TimeSource::System
}

/// Get the current clock
///
/// This is a convenience function that calls `get_time_source(None)`.
///
/// # Examples
///
/// ```
/// use laptrace_timesource::time_source;
///
/// let ts = time_source();
/// let now = ts.now();
/// ```
#[inline]
pub fn time_source() -> TimeSource {
    get_time_source(None)
}
