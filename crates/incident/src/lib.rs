//! Incident crate: Statuspage feed fetching, change detection and event sinks.
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cognitive_complexity)]
/// Conditional-GET feed client
pub mod client;
/// Seen-state tracking
pub mod detector;
/// Poll cycle errors
pub mod error;
/// Incident data model and payload decoding
pub mod model;
/// Per-feed polling loop
pub mod monitor;
/// Event sinks
pub mod sink;

pub use client::{CacheValidators, FetchOutcome, Fetcher, Transport};
pub use detector::ChangeDetector;
pub use error::Error;
pub use model::{Incident, IncidentSummary, IncidentUpdate, Source, UpdateStatus};
pub use monitor::{CycleReport, SourceMonitor};
pub use sink::{ConsoleSink, DetectedEvent, EventSink};
