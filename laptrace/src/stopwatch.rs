// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The concurrent lap-recording stopwatch engine.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use jiff::SignedDuration;
use laptrace_timesource::{TimeSource, time_source};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::format::{Formatter, default_formatter};
use crate::lap::{Lap, RenderedLap};
use crate::metadata::Metadata;

/// A stopwatch that records elapsed time as a sequence of named laps.
///
/// The stopwatch tracks total running time since its (possibly offset)
/// start, pauses excluded, and splits it into non-overlapping laps at each
/// call to [`Self::lap`]. It has two states, running and stopped, toggled
/// with [`Self::start`] and [`Self::stop`]; [`Self::reset`] discards all
/// history and makes the instance reusable indefinitely.
///
/// All methods take `&self`: a `Stopwatch` can be shared by reference (or
/// inside an `Arc`) across threads, and every mutation is serialized
/// internally. Laps appear in the order their mutations were admitted,
/// which for concurrent callers is not necessarily the order the calls
/// were issued.
///
/// # Examples
///
/// ```
/// use laptrace::Stopwatch;
///
/// let sw = Stopwatch::default();
/// sw.lap("Session Create");
/// sw.lap("Delete File");
/// sw.lap_with_data("Close DB", [("row_count", 2)]);
///
/// let laps = sw.laps();
/// assert_eq!(laps.len(), 3);
/// assert_eq!(laps[0].label(), "Session Create");
/// ```
pub struct Stopwatch {
    time_source: TimeSource,
    state: RwLock<State>,
    // Lap durations that had to be clamped to zero (clock anomaly).
    clamped: AtomicU64,
}

struct State {
    start: Instant,
    stopped: Option<Instant>,
    mark: Duration,
    laps: Vec<Lap>,
    formatter: Formatter,
}

impl State {
    fn fresh(now: Instant, offset: SignedDuration, active: bool, formatter: Formatter) -> Self {
        Self {
            start: shifted_start(now, offset),
            stopped: (!active).then_some(now),
            mark: Duration::ZERO,
            laps: Vec::new(),
            formatter,
        }
    }

    fn is_running(&self) -> bool {
        self.stopped.is_none()
    }

    /// Time the stopwatch has been running, pauses excluded. Saturates at
    /// zero while a negative construction offset keeps `start` in the
    /// future.
    fn elapsed(&self, now: Instant) -> Duration {
        self.stopped
            .unwrap_or(now)
            .saturating_duration_since(self.start)
    }

    fn lap_time(&self, now: Instant) -> Duration {
        self.elapsed(now).saturating_sub(self.mark)
    }
}

fn shifted_start(now: Instant, offset: SignedDuration) -> Instant {
    if offset.is_negative() {
        // Future start: a countdown before elapsed time turns positive.
        return now + offset.unsigned_abs();
    }
    match now.checked_sub(offset.unsigned_abs()) {
        Some(start) => start,
        None => {
            tracing::warn!(
                %offset,
                "offset precedes the platform's clock origin; starting unshifted"
            );
            now
        }
    }
}

impl Stopwatch {
    /// Creates a new stopwatch with its starting time offset by a
    /// user-defined value.
    ///
    /// A positive `offset` places the start in the past, so elapsed time
    /// begins at `offset`. A negative `offset` results in a countdown:
    /// elapsed time reads zero until the future start passes. Any signed
    /// value is accepted.
    ///
    /// If `active` is false the stopwatch is created stopped and must be
    /// [`Self::start`]ed before it accumulates time.
    ///
    /// The clock is resolved through [`laptrace_timesource::time_source`],
    /// so a thread-local override set in a test applies here.
    ///
    /// # Examples
    ///
    /// ```
    /// use laptrace::{SignedDuration, Stopwatch};
    ///
    /// let sw = Stopwatch::new(SignedDuration::from_secs(60), true);
    /// assert!(sw.elapsed().as_secs() >= 60);
    /// ```
    pub fn new(offset: SignedDuration, active: bool) -> Self {
        Self::new_with_time_source(time_source(), offset, active)
    }

    /// Creates a new stopwatch reading the given clock.
    ///
    /// This is useful for driving a stopwatch from a fake or paused clock
    /// in tests.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use laptrace::{SignedDuration, Stopwatch};
    /// use laptrace::timesource::{TimeSource, fakes::ManualClock};
    ///
    /// let clock = ManualClock::starting_now();
    /// let sw = Stopwatch::new_with_time_source(
    ///     TimeSource::custom(clock.clone()),
    ///     SignedDuration::ZERO,
    ///     true,
    /// );
    ///
    /// clock.advance(Duration::from_millis(100));
    /// assert_eq!(sw.elapsed(), Duration::from_millis(100));
    /// ```
    pub fn new_with_time_source(
        time_source: TimeSource,
        offset: SignedDuration,
        active: bool,
    ) -> Self {
        let now = time_source.now();
        Self {
            time_source,
            state: RwLock::new(State::fresh(now, offset, active, default_formatter())),
            clamped: AtomicU64::new(0),
        }
    }

    /// Reinitializes the stopwatch as if freshly constructed, allowing the
    /// instance to be re-used instead of creating a new one.
    ///
    /// All recorded laps are discarded and are not retrievable afterwards;
    /// the lap boundary and the clamp counter return to zero. The installed
    /// formatter is preserved.
    ///
    /// Mutations racing with a reset are admitted in lock-acquisition
    /// order: a lap that is admitted first completes against the old
    /// timeline (and is then discarded with it), one admitted after the
    /// reset records against the fresh timeline. State is never torn.
    ///
    /// # Examples
    ///
    /// ```
    /// use laptrace::{SignedDuration, Stopwatch};
    ///
    /// let sw = Stopwatch::default();
    /// sw.lap("Session Create");
    /// sw.reset(SignedDuration::ZERO, true);
    /// assert!(sw.laps().is_empty());
    /// ```
    pub fn reset(&self, offset: SignedDuration, active: bool) {
        let mut state = self.write();
        let now = self.time_source.now();
        let formatter = state.formatter.clone();
        *state = State::fresh(now, offset, active, formatter);
        self.clamped.store(0, Ordering::Relaxed);
    }

    /// Initiates, or resumes, the counting-up process.
    ///
    /// The start anchor is shifted forward by the time spent stopped, so
    /// elapsed time is continuous across stop/resume cycles and paused
    /// time is excluded. No-op if already running.
    pub fn start(&self) {
        let mut state = self.write();
        let now = self.time_source.now();
        if let Some(stopped) = state.stopped.take() {
            state.start += now.saturating_duration_since(stopped);
        }
    }

    /// Makes the stopwatch stop counting up.
    ///
    /// Recorded laps are kept, and laps may still be recorded while
    /// stopped. No-op if already stopped.
    pub fn stop(&self) {
        let mut state = self.write();
        let now = self.time_source.now();
        if state.is_running() {
            state.stopped = Some(now);
        }
    }

    /// True if the stopwatch is running (counting up).
    pub fn is_running(&self) -> bool {
        self.read().is_running()
    }

    /// Time the stopwatch has been running, pauses excluded.
    ///
    /// While a negative construction offset keeps the start in the future,
    /// this reads zero.
    pub fn elapsed(&self) -> Duration {
        let state = self.read();
        let now = self.time_source.now();
        state.elapsed(now)
    }

    /// Time accrued since the last lap boundary (or since the start, if no
    /// lap has been recorded yet).
    ///
    /// Read-only: safe to call at any time, including on a stopped
    /// stopwatch, without affecting the next recorded lap.
    pub fn lap_time(&self) -> Duration {
        let state = self.read();
        let now = self.time_source.now();
        state.lap_time(now)
    }

    /// Records a lap: the time accrued since the previous lap boundary is
    /// attributed to `label`, and the boundary advances.
    ///
    /// The duration is computed at the instant the mutation is admitted,
    /// so concurrent laps never observe the same boundary.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use laptrace::{SignedDuration, Stopwatch};
    /// use laptrace::timesource::{TimeSource, fakes::ManualClock};
    ///
    /// let clock = ManualClock::starting_now();
    /// let sw = Stopwatch::new_with_time_source(
    ///     TimeSource::custom(clock.clone()),
    ///     SignedDuration::ZERO,
    ///     true,
    /// );
    ///
    /// clock.advance(Duration::from_millis(100));
    /// let lap = sw.lap("Session Create");
    /// assert_eq!(lap.duration(), Duration::from_millis(100));
    ///
    /// clock.advance(Duration::from_millis(250));
    /// let lap = sw.lap("Delete File");
    /// assert_eq!(lap.duration(), Duration::from_millis(250));
    /// ```
    pub fn lap(&self, label: impl Into<String>) -> Lap {
        self.record(label.into(), Metadata::new())
    }

    /// Records a lap like [`Self::lap`], attaching the given metadata to
    /// the record.
    ///
    /// # Examples
    ///
    /// ```
    /// use laptrace::Stopwatch;
    ///
    /// let sw = Stopwatch::default();
    /// sw.set_formatter(|d| format!("{:.0}", d.as_secs_f64()));
    ///
    /// sw.lap_with_data("Close DB", [("row_count", 2)]);
    /// assert_eq!(
    ///     sw.render(),
    ///     r#"[{"state":"Close DB","time":"0","row_count":"2"}]"#,
    /// );
    /// ```
    pub fn lap_with_data(&self, label: impl Into<String>, metadata: impl Into<Metadata>) -> Lap {
        self.record(label.into(), metadata.into())
    }

    fn record(&self, label: String, metadata: Metadata) -> Lap {
        let mut state = self.write();
        let now = self.time_source.now();
        let elapsed = state.elapsed(now);
        let duration = match elapsed.checked_sub(state.mark) {
            Some(duration) => duration,
            None => {
                self.clamped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%label, "clock went backwards; lap duration clamped to zero");
                Duration::ZERO
            }
        };
        let lap = Lap::new(label, duration, metadata, state.formatter.clone());
        state.mark = elapsed;
        state.laps.push(lap.clone());
        lap
    }

    /// Returns a snapshot of the laps recorded so far, in recorded order.
    ///
    /// The snapshot is a defensive copy: laps recorded afterwards do not
    /// appear in it.
    ///
    /// # Examples
    ///
    /// ```
    /// use laptrace::Stopwatch;
    ///
    /// let sw = Stopwatch::default();
    /// sw.lap("Create File");
    ///
    /// let snapshot = sw.laps();
    /// sw.lap("Upload File");
    /// assert_eq!(snapshot.len(), 1);
    /// assert_eq!(sw.laps().len(), 2);
    /// ```
    pub fn laps(&self) -> Vec<Lap> {
        self.read().laps.clone()
    }

    /// Replaces the active duration formatter.
    ///
    /// Rendering is lazy, so the replacement applies to every lap,
    /// including laps recorded before the call, the next time the
    /// stopwatch is rendered.
    ///
    /// # Examples
    ///
    /// ```
    /// use laptrace::Stopwatch;
    ///
    /// let sw = Stopwatch::default();
    /// sw.set_formatter(|d| format!("{:.0}", d.as_secs_f64()));
    /// ```
    pub fn set_formatter(&self, formatter: impl Fn(Duration) -> String + Send + Sync + 'static) {
        self.write().formatter = Arc::new(formatter);
    }

    /// Number of laps whose computed duration was negative and was clamped
    /// to zero since construction or the last [`Self::reset`].
    ///
    /// A non-zero value means the clock went backwards at some point:
    /// recorded durations are clamped rather than reported negative, and
    /// this counter is the data-quality flag for it.
    pub fn clamped_laps(&self) -> u64 {
        self.clamped.load(Ordering::Relaxed)
    }

    /// Renders every lap in recorded order, comma-separated and wrapped in
    /// `[...]`; an empty stopwatch renders `[]`.
    ///
    /// This is the canonical external representation: `Display` and
    /// `serde` serialization produce exactly the same string. The
    /// stopwatch's current formatter is applied to every lap.
    ///
    /// # Examples
    ///
    /// ```
    /// use laptrace::Stopwatch;
    ///
    /// let sw = Stopwatch::default();
    /// sw.set_formatter(|d| format!("{:.0}", d.as_secs_f64()));
    /// sw.lap("Create File");
    /// sw.lap("Edit File");
    ///
    /// assert_eq!(
    ///     sw.render(),
    ///     r#"[{"state":"Create File","time":"0"},{"state":"Edit File","time":"0"}]"#,
    /// );
    /// ```
    pub fn render(&self) -> String {
        serde_json::to_string(self).expect("rendering laps to a string cannot fail")
    }

    /// Formatter and laps for one render pass. Snapshotting under the read
    /// lock keeps formatter invocations outside the critical section and
    /// gives the pass one consistent formatter.
    fn snapshot(&self) -> (Formatter, Vec<Lap>) {
        let state = self.read();
        (state.formatter.clone(), state.laps.clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state
            .read()
            .expect("a caller panicked while holding the stopwatch lock")
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state
            .write()
            .expect("a caller panicked while holding the stopwatch lock")
    }
}

impl Default for Stopwatch {
    /// A running stopwatch with no offset.
    fn default() -> Self {
        Self::new(SignedDuration::ZERO, true)
    }
}

impl fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("Stopwatch")
            .field("running", &state.is_running())
            .field("mark", &state.mark)
            .field("laps", &state.laps.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Stopwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for Stopwatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (formatter, laps) = self.snapshot();
        let mut seq = serializer.serialize_seq(Some(laps.len()))?;
        for lap in &laps {
            seq.serialize_element(&RenderedLap {
                lap,
                formatter: &formatter,
            })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use jiff::SignedDuration;
    use laptrace_timesource::fakes::ManualClock;
    use laptrace_timesource::{TimeSource, set_time_source};
    use tokio::time::advance;

    use super::Stopwatch;

    #[tokio::test(start_paused = true)]
    async fn elapsed_follows_running_time() {
        let _ts = set_time_source(TimeSource::tokio());
        let sw = Stopwatch::default();
        advance(Duration::from_secs(5)).await;
        assert_eq!(sw.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_is_excluded_from_elapsed_time() {
        let _ts = set_time_source(TimeSource::tokio());
        let sw = Stopwatch::default();

        advance(Duration::from_millis(100)).await;
        sw.stop();
        advance(Duration::from_millis(100)).await;
        sw.start();

        assert_eq!(sw.elapsed(), Duration::from_millis(100));
        advance(Duration::from_millis(50)).await;
        assert_eq!(sw.elapsed(), Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn redundant_start_and_stop_are_noops() {
        let _ts = set_time_source(TimeSource::tokio());
        let sw = Stopwatch::default();

        advance(Duration::from_secs(1)).await;
        sw.start();
        assert!(sw.is_running());
        assert_eq!(sw.elapsed(), Duration::from_secs(1));

        sw.stop();
        advance(Duration::from_secs(1)).await;
        sw.stop();
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn laps_are_relative_to_the_previous_boundary() {
        let _ts = set_time_source(TimeSource::tokio());
        let sw = Stopwatch::default();

        advance(Duration::from_secs(1)).await;
        let first = sw.lap("first");
        advance(Duration::from_secs(2)).await;
        let second = sw.lap("second");

        assert_eq!(first.duration(), Duration::from_secs(1));
        assert_eq!(second.duration(), Duration::from_secs(2));
        assert_eq!(sw.lap_time(), Duration::ZERO);
        assert_eq!(sw.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn lap_time_counts_since_the_last_boundary_without_mutating() {
        let _ts = set_time_source(TimeSource::tokio());
        let sw = Stopwatch::default();

        advance(Duration::from_secs(1)).await;
        sw.lap("first");
        advance(Duration::from_millis(250)).await;
        assert_eq!(sw.lap_time(), Duration::from_millis(250));
        assert_eq!(sw.lap_time(), Duration::from_millis(250));

        sw.stop();
        advance(Duration::from_secs(9)).await;
        assert_eq!(sw.lap_time(), Duration::from_millis(250));

        let lap = sw.lap("after stop");
        assert_eq!(lap.duration(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn inactive_stopwatch_accumulates_nothing_until_started() {
        let _ts = set_time_source(TimeSource::tokio());
        let sw = Stopwatch::new(SignedDuration::ZERO, false);

        assert!(!sw.is_running());
        advance(Duration::from_secs(5)).await;
        assert_eq!(sw.elapsed(), Duration::ZERO);

        sw.start();
        advance(Duration::from_secs(2)).await;
        assert_eq!(sw.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn positive_offset_shifts_the_start_into_the_past() {
        let _ts = set_time_source(TimeSource::tokio());
        let sw = Stopwatch::new(SignedDuration::from_secs(60), true);
        assert_eq!(sw.elapsed(), Duration::from_secs(60));
        assert_eq!(sw.lap("offset lap").duration(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn negative_offset_counts_down_before_elapsing() {
        let _ts = set_time_source(TimeSource::tokio());
        let sw = Stopwatch::new(SignedDuration::from_secs(-5), true);

        assert_eq!(sw.elapsed(), Duration::ZERO);
        advance(Duration::from_secs(4)).await;
        assert_eq!(sw.elapsed(), Duration::ZERO);

        // laps during the countdown are empty, not clamp anomalies
        assert_eq!(sw.lap("countdown").duration(), Duration::ZERO);
        assert_eq!(sw.clamped_laps(), 0);

        advance(Duration::from_secs(3)).await;
        assert_eq!(sw.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_reinitializes_but_keeps_the_formatter() {
        let _ts = set_time_source(TimeSource::tokio());
        let sw = Stopwatch::default();
        sw.set_formatter(|d| format!("{:.0}", d.as_secs_f64()));

        advance(Duration::from_secs(1)).await;
        sw.lap("before reset");
        sw.reset(SignedDuration::ZERO, true);

        assert!(sw.laps().is_empty());
        assert_eq!(sw.render(), "[]");

        advance(Duration::from_secs(2)).await;
        assert_eq!(sw.lap_time(), Duration::from_secs(2));
        sw.lap("after reset");
        assert_eq!(sw.render(), r#"[{"state":"after reset","time":"2"}]"#);
    }

    #[tokio::test(start_paused = true)]
    async fn formatter_replacement_applies_to_all_laps_on_next_render() {
        let _ts = set_time_source(TimeSource::tokio());
        let sw = Stopwatch::default();

        advance(Duration::from_secs(1)).await;
        sw.lap("first");
        advance(Duration::from_secs(2)).await;
        sw.lap("second");

        assert_eq!(
            sw.render(),
            r#"[{"state":"first","time":"1s"},{"state":"second","time":"2s"}]"#
        );

        sw.set_formatter(|d| format!("{:.0}", d.as_secs_f64()));
        assert_eq!(
            sw.render(),
            r#"[{"state":"first","time":"1"},{"state":"second","time":"2"}]"#
        );
    }

    #[test]
    fn clock_anomaly_clamps_the_lap_to_zero() {
        let clock = ManualClock::starting_now();
        let sw = Stopwatch::new_with_time_source(
            TimeSource::custom(clock.clone()),
            SignedDuration::ZERO,
            true,
        );

        clock.advance(Duration::from_secs(10));
        assert_eq!(sw.lap("before").duration(), Duration::from_secs(10));

        clock.rewind(Duration::from_secs(5));
        let clamped = sw.lap("anomaly");
        assert_eq!(clamped.duration(), Duration::ZERO);
        assert_eq!(sw.clamped_laps(), 1);

        // the boundary follows the rewound clock, so recording recovers
        clock.advance(Duration::from_secs(1));
        assert_eq!(sw.lap("after").duration(), Duration::from_secs(1));
        assert_eq!(sw.clamped_laps(), 1);
    }

    #[test]
    fn reset_clears_the_clamp_counter() {
        let clock = ManualClock::starting_now();
        let sw = Stopwatch::new_with_time_source(
            TimeSource::custom(clock.clone()),
            SignedDuration::ZERO,
            true,
        );

        clock.advance(Duration::from_secs(10));
        sw.lap("before");
        clock.rewind(Duration::from_secs(5));
        sw.lap("anomaly");
        assert_eq!(sw.clamped_laps(), 1);

        sw.reset(SignedDuration::ZERO, true);
        assert_eq!(sw.clamped_laps(), 0);
    }
}
