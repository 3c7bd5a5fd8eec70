//! Statuswatch Driver - validates configuration and runs one monitor per feed

use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use config::Opts;
use eyre::{Result, bail};
use incident::{ConsoleSink, EventSink, Fetcher, Source, Transport};
use runtime::{Shutdown, ShutdownSignal, join_with_timeout};
use tracing::info;

/// Owns the shared transport and sink, and the list of feeds to monitor.
#[derive(Debug)]
pub struct Driver {
    /// Feeds to monitor, in configuration order
    pub sources: Vec<Source>,
    /// Fetcher shared by every monitor
    pub fetcher: Fetcher,
    /// Destination for detected events
    pub sink: Arc<dyn EventSink>,
    /// How long to wait for monitors after a shutdown signal
    pub shutdown_timeout: Duration,
}

impl Driver {
    /// Create a new driver with the given configuration
    pub fn new(opts: Opts) -> Result<Self> {
        info!("Initializing driver");

        let sources = build_sources(&opts)?;
        let transport =
            Transport::new(opts.http.max_connections, opts.http.request_timeout())?;

        Ok(Self {
            sources,
            fetcher: Fetcher::new(transport),
            sink: Arc::new(ConsoleSink::stdout()),
            shutdown_timeout: opts.shutdown_timeout(),
        })
    }

    /// Replace the console sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn start(self) -> Result<()> {
        let signal = ShutdownSignal::new()?;
        self.run_until(signal).await
    }

    /// Run every monitor until `stop` resolves, then cancel them and wait for them to exit.
    pub async fn run_until<F>(self, stop: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let shutdown = Shutdown::new();
        let handles = self.start_monitors(&shutdown);

        stop.await;
        info!(monitors = handles.len(), "Shutdown signal received, stopping monitors");
        shutdown.trigger();

        if join_with_timeout(handles, self.shutdown_timeout).await {
            info!("All monitors stopped");
        }
        Ok(())
    }
}

/// Turn configured feeds into sources, rejecting empty or ambiguous configurations.
pub fn build_sources(opts: &Opts) -> Result<Vec<Source>> {
    if opts.poll_interval_secs == 0 {
        bail!("poll interval must be positive");
    }
    if opts.http.request_timeout_secs == 0 {
        bail!("request timeout must be positive");
    }
    if opts.http.max_connections == 0 {
        bail!("max connections must be positive");
    }
    if opts.feeds.is_empty() {
        bail!("no feeds configured; pass --feed NAME=URL or set STATUSWATCH_FEEDS");
    }

    let mut names = HashSet::new();
    for feed in &opts.feeds {
        if !names.insert(feed.name.as_str()) {
            bail!("duplicate feed name `{}`", feed.name);
        }
    }

    Ok(opts
        .feeds
        .iter()
        .map(|feed| {
            Source::new(
                feed.name.clone(),
                feed.url.clone(),
                feed.poll_interval.unwrap_or_else(|| opts.poll_interval()),
            )
        })
        .collect())
}
