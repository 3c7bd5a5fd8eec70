//! Monitor spawning and the startup banner

use std::{
    io::{self, Write},
    sync::Arc,
    time::Duration,
};

use incident::{Source, SourceMonitor};
use runtime::Shutdown;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Monitoring methods for the Driver
impl crate::driver::Driver {
    /// Spawn one monitor per source, all sharing the driver's fetcher and sink.
    ///
    /// Each monitor owns its own validators and seen-state and stops when `shutdown`
    /// is triggered.
    pub fn start_monitors(&self, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        let handles = self
            .sources
            .iter()
            .cloned()
            .map(|source| {
                SourceMonitor::new(source, self.fetcher.clone(), Arc::clone(&self.sink))
                    .spawn(shutdown.token())
            })
            .collect();

        info!(
            sources = self.sources.len(),
            interval_secs = ?uniform_interval(&self.sources).map(|i| i.as_secs()),
            "Monitors started"
        );
        if let Err(e) = writeln!(io::stdout().lock(), "{}", banner(&self.sources)) {
            warn!(error = %e, "failed to print banner");
        }

        handles
    }
}

/// The poll interval shared by every source, if there is one.
pub fn uniform_interval(sources: &[Source]) -> Option<Duration> {
    let first = sources.first()?.poll_interval;
    sources.iter().all(|s| s.poll_interval == first).then_some(first)
}

/// One-time startup banner.
pub fn banner(sources: &[Source]) -> String {
    let mut line = format!("🔍 Tracking {} source(s).", sources.len());
    if let Some(interval) = uniform_interval(sources) {
        line.push_str(&format!(" Polling every {}s.", interval.as_secs()));
    }
    line.push_str(" Press Ctrl+C to stop.");
    format!("{line}\n{}", "=".repeat(60))
}
