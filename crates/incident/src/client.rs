use std::{sync::Arc, time::Duration};

use reqwest::{
    Client as HttpClient, StatusCode,
    header::{ETAG, HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED},
};
use tokio::{sync::Semaphore, time};
use tracing::debug;

use crate::{
    error::Error,
    model::{Incident, Source, parse_incidents},
};

const USER_AGENT: &str = concat!("statuswatch/", env!("CARGO_PKG_VERSION"));

/// HTTP transport shared by every feed.
///
/// Wraps a single pooled [`reqwest::Client`] and a semaphore bounding the number of
/// requests in flight at once.
#[derive(Debug, Clone)]
pub struct Transport {
    http: HttpClient,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl Transport {
    /// Build a transport with the given connection bound and per-request timeout.
    pub fn new(max_connections: usize, timeout: Duration) -> eyre::Result<Self> {
        let http = HttpClient::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .pool_max_idle_per_host(max_connections)
            .build()?;
        Ok(Self::from_client(http, max_connections, timeout))
    }

    /// Wrap an existing client.
    ///
    /// `timeout` bounds a whole fetch, including the wait for a free connection slot.
    pub fn from_client(http: HttpClient, max_connections: usize, timeout: Duration) -> Self {
        Self { http, permits: Arc::new(Semaphore::new(max_connections.max(1))), timeout }
    }
}

/// Conditional-request validators remembered from the last successful response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheValidators {
    /// `ETag` response header
    pub etag: Option<String>,
    /// `Last-Modified` response header
    pub last_modified: Option<String>,
}

impl CacheValidators {
    fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
        Self { etag: get(ETAG), last_modified: get(LAST_MODIFIED) }
    }

    /// Whether no validator is known yet.
    pub const fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Successful result of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server answered 304; nothing was transferred.
    NotModified,
    /// A freshly decoded document and the validators that came with it.
    Snapshot {
        /// Incidents in feed order
        incidents: Vec<Incident>,
        /// Validators replacing the previous ones
        validators: CacheValidators,
    },
}

/// Conditional GET client for Statuspage incident feeds.
#[derive(Debug, Clone)]
pub struct Fetcher {
    transport: Transport,
}

impl Fetcher {
    /// Create a fetcher on top of a shared transport.
    pub const fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Fetch `source`'s feed, sending `validators` as preconditions.
    ///
    /// The caller owns the validators and should replace them with the ones carried by
    /// [`FetchOutcome::Snapshot`]. Failures leave nothing to update.
    ///
    /// The transport's timeout covers queueing for a connection slot as well as the
    /// request and body transfer.
    pub async fn fetch(
        &self,
        source: &Source,
        validators: &CacheValidators,
    ) -> Result<FetchOutcome, Error> {
        let bound = self.transport.timeout;
        time::timeout(bound, self.fetch_unbounded(source, validators))
            .await
            .map_err(|_| Error::Timeout(bound))?
    }

    async fn fetch_unbounded(
        &self,
        source: &Source,
        validators: &CacheValidators,
    ) -> Result<FetchOutcome, Error> {
        // The semaphore is never closed, so acquisition only fails during teardown.
        let _permit = self.transport.permits.acquire().await.ok();

        let mut req = self.transport.http.get(source.feed_url.clone());
        if let Some(etag) = &validators.etag {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &validators.last_modified {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }

        let resp = req.send().await?;
        let status = resp.status();

        if status == StatusCode::NOT_MODIFIED {
            debug!(source = %source.name, "feed not modified");
            return Ok(FetchOutcome::NotModified);
        }
        if !status.is_success() {
            return Err(Error::Protocol(status));
        }

        let validators = CacheValidators::from_headers(resp.headers());
        let body = resp.bytes().await?;
        let incidents = parse_incidents(&source.name, &body)?;

        debug!(
            source = %source.name,
            incidents = incidents.len(),
            bytes = body.len(),
            etag = ?validators.etag,
            "fetched feed"
        );

        Ok(FetchOutcome::Snapshot { incidents, validators })
    }
}
