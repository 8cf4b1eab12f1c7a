// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::Time;

/// Clock that only moves when told to, via a cloneable shared handle
///
/// Every clone reads and drives the same underlying reading, so a test can
/// hand one handle to the code under test and keep another to advance time.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<Mutex<Instant>>);

impl ManualClock {
    /// Create a new ManualClock whose reading starts at the current instant
    ///
    /// The reading will not move until [`Self::advance`] is called.
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
    /// // wall-clock time passing changes nothing
    /// assert_eq!(ts.now(), start);
    /// ```
    pub fn starting_now() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    /// Move the clock's reading forward by a duration
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
    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }

    /// Move the clock's reading backward by a duration
    ///
    /// Clocks are expected to be monotonic; this exists so tests can stage
    /// a non-monotonic anomaly and observe how the code under test reacts.
    ///
    /// # Panics
    ///
    /// Panics if the rewind would move the reading before the clock's
    /// starting instant.
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
    /// clock.advance(Duration::from_secs(10));
    /// clock.rewind(Duration::from_secs(4));
    /// assert_eq!(ts.now() - start, Duration::from_secs(6));
    /// ```
    pub fn rewind(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now = now
            .checked_sub(by)
            .expect("rewound before the clock's starting instant");
    }
}

impl Time for ManualClock {
    fn now(&self) -> Instant {
        *self.0.lock().unwrap()
    }
}
