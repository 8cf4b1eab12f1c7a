// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The immutable record of one completed measurement interval.

use std::fmt;
use std::time::Duration;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::format::Formatter;
use crate::metadata::Metadata;

/// One completed measurement interval: a label, the duration attributed to
/// it, and optional metadata.
///
/// Laps are immutable once recorded. The handle returned by
/// [`crate::Stopwatch::lap`] carries the formatter that was current when it
/// was produced, so it renders standalone:
///
/// ```
/// use laptrace::Stopwatch;
///
/// let sw = Stopwatch::default();
/// sw.set_formatter(|d| format!("{:.0}", d.as_secs_f64()));
/// let lap = sw.lap("Create File");
/// assert_eq!(lap.render(), r#"{"state":"Create File","time":"0"}"#);
/// ```
///
/// [`crate::Stopwatch::render`], by contrast, always applies the
/// stopwatch's *current* formatter to every lap.
#[derive(Clone)]
pub struct Lap {
    label: String,
    duration: Duration,
    metadata: Metadata,
    formatter: Formatter,
}

impl Lap {
    pub(crate) fn new(
        label: String,
        duration: Duration,
        metadata: Metadata,
        formatter: Formatter,
    ) -> Self {
        Self {
            label,
            duration,
            metadata,
            formatter,
        }
    }

    /// The caller-supplied label naming the measured phase.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The elapsed time attributed to this lap.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Metadata attached via [`crate::Stopwatch::lap_with_data`]; empty for
    /// plain laps.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Render this lap as `{"state":"<label>","time":"<formatted>"}`, with
    /// one additional `"<key>":"<value>"` field per metadata entry, in
    /// insertion order.
    pub fn render(&self) -> String {
        serde_json::to_string(self).expect("rendering a lap to a string cannot fail")
    }
}

impl fmt::Debug for Lap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lap")
            .field("label", &self.label)
            .field("duration", &self.duration)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

// Formatters have no useful notion of equality; two laps are equal when
// their recorded fields are.
impl PartialEq for Lap {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
            && self.duration == other.duration
            && self.metadata == other.metadata
    }
}

impl fmt::Display for Lap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for Lap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_lap(serializer, self, &self.formatter)
    }
}

/// A lap paired with the formatter a render pass has chosen for it. The
/// stopwatch renderer uses this to apply its current formatter to every
/// lap, whatever each handle carries.
pub(crate) struct RenderedLap<'a> {
    pub(crate) lap: &'a Lap,
    pub(crate) formatter: &'a Formatter,
}

impl Serialize for RenderedLap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_lap(serializer, self.lap, self.formatter)
    }
}

fn serialize_lap<S: Serializer>(
    serializer: S,
    lap: &Lap,
    formatter: &Formatter,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(2 + lap.metadata.len()))?;
    map.serialize_entry("state", lap.label())?;
    map.serialize_entry("time", &formatter(lap.duration))?;
    for (key, value) in lap.metadata.iter() {
        map.serialize_entry(key, &value.to_string())?;
    }
    map.end()
}
