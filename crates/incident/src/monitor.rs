use std::{sync::Arc, time::Duration};

use runtime::ShutdownToken;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, error, info, warn};

use crate::{
    client::{CacheValidators, FetchOutcome, Fetcher},
    detector::ChangeDetector,
    error::Error,
    model::Source,
    sink::{DetectedEvent, EventSink},
};

/// Shortest period the run loop will tick at.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// What a single poll cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The feed answered 304
    pub not_modified: bool,
    /// Updates seen for the first time
    pub new_updates: usize,
    /// Events the sink failed to deliver
    pub sink_failures: usize,
}

/// Polls one feed and forwards new updates to a sink.
///
/// Owns the feed's cache validators and seen-state outright; nothing else reads or
/// writes them.
#[derive(Debug)]
pub struct SourceMonitor {
    source: Source,
    fetcher: Fetcher,
    sink: Arc<dyn EventSink>,
    validators: CacheValidators,
    detector: ChangeDetector,
}

impl SourceMonitor {
    /// Creates a new monitor with empty state.
    pub fn new(source: Source, fetcher: Fetcher, sink: Arc<dyn EventSink>) -> Self {
        Self {
            source,
            fetcher,
            sink,
            validators: CacheValidators::default(),
            detector: ChangeDetector::new(),
        }
    }

    /// Validators to send on the next request.
    pub const fn validators(&self) -> &CacheValidators {
        &self.validators
    }

    /// Seen-state of this feed.
    pub const fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Run one fetch → detect → emit cycle.
    ///
    /// Fetch and decode failures are returned untouched, leaving validators and
    /// seen-state as they were. Sink failures are logged per event and counted; the
    /// update still counts as seen so it is not announced twice.
    pub async fn poll_once(&mut self) -> Result<CycleReport, Error> {
        let (incidents, validators) = match self.fetcher.fetch(&self.source, &self.validators).await? {
            FetchOutcome::NotModified => {
                return Ok(CycleReport { not_modified: true, ..Default::default() });
            }
            FetchOutcome::Snapshot { incidents, validators } => (incidents, validators),
        };

        // The representation changed server-side, even if no update is new.
        self.validators = validators;

        let new = self.detector.diff(&incidents);
        let mut report = CycleReport { new_updates: new.len(), ..Default::default() };
        if new.is_empty() {
            debug!(source = %self.source.name, "no new updates");
            return Ok(report);
        }

        for update in &new {
            let event = DetectedEvent::new(&self.source.name, update);
            if let Err(e) = self.sink.emit(&event).await {
                let e = Error::Sink(e);
                error!(
                    source = %self.source.name,
                    incident_id = %event.incident.incident_id,
                    update_id = %event.update.update_id,
                    kind = e.kind(),
                    error = %e,
                    "failed to emit incident update"
                );
                report.sink_failures += 1;
            }
        }

        info!(
            source = %self.source.name,
            new_updates = report.new_updates,
            seen = self.detector.seen_count(),
            "reported new incident updates"
        );
        Ok(report)
    }

    /// Poll until `shutdown` fires.
    ///
    /// The first cycle starts immediately. Cancellation is observed both while waiting for
    /// the next tick and during a cycle, in which case the in-flight request is dropped.
    pub async fn run(mut self, mut shutdown: ShutdownToken) {
        info!(
            source = %self.source.name,
            url = %self.source.feed_url,
            interval_secs = self.source.poll_interval.as_secs(),
            "starting feed monitor"
        );

        let mut ticker = interval(self.source.poll_interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!(source = %self.source.name, "aborting in-flight poll");
                    break;
                }
                res = self.poll_once() => {
                    if let Err(e) = res {
                        warn!(
                            source = %self.source.name,
                            kind = e.kind(),
                            timeout = e.is_timeout(),
                            error = %e,
                            "poll cycle failed"
                        );
                    }
                }
            }
        }

        info!(source = %self.source.name, "feed monitor stopped");
    }

    /// Spawns the monitor on the Tokio runtime.
    pub fn spawn(self, shutdown: ShutdownToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
