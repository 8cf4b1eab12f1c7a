// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use crate::format::{Formatter, default_formatter};
pub use crate::lap::Lap;
pub use crate::metadata::{Metadata, MetadataValue};
pub use crate::stopwatch::Stopwatch;

pub mod format;
pub mod lap;
pub mod metadata;
pub mod stopwatch;

// Constructor offsets are signed; `std` has no signed duration type.
pub use jiff::SignedDuration;

/// Re-export of [`laptrace_timesource`], the clock abstraction used by
/// [`Stopwatch::new_with_time_source`].
pub use laptrace_timesource as timesource;
