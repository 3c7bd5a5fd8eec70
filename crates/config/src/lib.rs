//! Statuswatch configuration
use std::{fmt, str::FromStr, time::Duration};

use clap::Parser;
use url::Url;

/// Feed monitored when none is configured.
pub const DEFAULT_FEED: &str = "OpenAI=https://status.openai.com/api/v2/incidents.json";

/// A single `NAME=URL[@SECS]` feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSpec {
    /// Human-readable provider name
    pub name: String,
    /// Statuspage v2 incidents endpoint
    pub url: Url,
    /// Per-feed poll interval, overriding the global one
    pub poll_interval: Option<Duration>,
}

impl FromStr for FeedSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rest) =
            s.split_once('=').ok_or_else(|| format!("expected NAME=URL[@SECS], got `{s}`"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("feed name is empty in `{s}`"));
        }

        // Only treat a trailing `@<digits>` as an interval, so userinfo in URLs survives.
        let (raw_url, poll_interval) = match rest.rsplit_once('@') {
            Some((url, secs)) if !secs.is_empty() && secs.bytes().all(|b| b.is_ascii_digit()) => {
                let secs: u64 = secs.parse().map_err(|e| format!("invalid interval `{secs}`: {e}"))?;
                if secs == 0 {
                    return Err(format!("poll interval for `{name}` must be positive"));
                }
                (url, Some(Duration::from_secs(secs)))
            }
            _ => (rest, None),
        };

        let url = Url::parse(raw_url.trim()).map_err(|e| format!("invalid url `{raw_url}`: {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("unsupported scheme `{}` for feed `{name}`", url.scheme()));
        }

        Ok(Self { name: name.to_owned(), url, poll_interval })
    }
}

impl fmt::Display for FeedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.url)?;
        if let Some(interval) = self.poll_interval {
            write!(f, "@{}", interval.as_secs())?;
        }
        Ok(())
    }
}

/// HTTP transport configuration options
#[derive(Debug, Clone, Parser)]
pub struct HttpOpts {
    /// Per-request timeout in seconds
    #[clap(long, env = "REQUEST_TIMEOUT_SECS", default_value = "15")]
    pub request_timeout_secs: u64,
    /// Maximum number of concurrent requests across all feeds
    #[clap(long, env = "MAX_CONNECTIONS", default_value = "100")]
    pub max_connections: usize,
}

impl HttpOpts {
    /// Request timeout as a [`Duration`].
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// CLI options for statuswatch
#[derive(Debug, Clone, Parser)]
#[clap(name = "statuswatch", about = "Watch Statuspage feeds and print new incident updates")]
pub struct Opts {
    /// Feeds to monitor, as NAME=URL or NAME=URL@SECS
    #[clap(
        long = "feed",
        env = "STATUSWATCH_FEEDS",
        value_delimiter = ',',
        default_value = DEFAULT_FEED
    )]
    pub feeds: Vec<FeedSpec>,

    /// Default poll interval in seconds
    #[clap(long, env = "POLL_INTERVAL_SECS", default_value = "60")]
    pub poll_interval_secs: u64,

    /// Seconds to wait for feed tasks to stop after a shutdown signal
    #[clap(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value = "5")]
    pub shutdown_timeout_secs: u64,

    /// HTTP transport configuration
    #[clap(flatten)]
    pub http: HttpOpts,
}

impl Opts {
    /// Global poll interval as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Shutdown grace period as a [`Duration`].
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
