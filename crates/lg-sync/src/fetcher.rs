//! Filter list retrieval
//!
//! A [`Transport`] performs one GET with a bounded timeout. There is no
//! retry loop: a failure goes straight back to the cache layer, which
//! decides whether stale data can be served instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{SyncConfig, TransportKind};
use crate::error::FetchError;

// =============================================================================
// Transports
// =============================================================================

/// Something that can GET a URL as text.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    async fn get(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// Async reqwest client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Client honouring the system proxy settings.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    /// Client that ignores proxy environment variables.
    pub fn direct() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Blocking reqwest client, driven from the blocking thread pool.
///
/// The client is created and dropped inside the blocking task; a blocking
/// client must never be torn down on an async worker thread.
#[derive(Debug, Default)]
pub struct BlockingHttpTransport {
    direct: bool,
}

impl BlockingHttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore proxy environment variables.
    pub fn direct() -> Self {
        Self { direct: true }
    }
}

#[async_trait]
impl Transport for BlockingHttpTransport {
    fn name(&self) -> &'static str {
        "blocking-http"
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let url = url.to_string();
        let direct = self.direct;
        let task = tokio::task::spawn_blocking(move || -> Result<String, FetchError> {
            let mut builder = reqwest::blocking::Client::builder().timeout(timeout);
            if direct {
                builder = builder.no_proxy();
            }
            let client = builder.build()?;
            let response = client.get(&url).send()?.error_for_status()?;
            Ok(response.text()?)
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(FetchError::WorkerPanicked(e.to_string())),
        }
    }
}

/// Tries `primary` once, then `secondary` once.
pub struct FallbackTransport {
    primary: Box<dyn Transport>,
    secondary: Box<dyn Transport>,
}

impl FallbackTransport {
    pub fn new(primary: Box<dyn Transport>, secondary: Box<dyn Transport>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Transport for FallbackTransport {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        match self.primary.get(url, timeout).await {
            Ok(text) => Ok(text),
            Err(e) => {
                log::warn!(
                    "{} transport failed for {}: {}; trying {}",
                    self.primary.name(),
                    url,
                    e,
                    self.secondary.name()
                );
                self.secondary.get(url, timeout).await
            }
        }
    }
}

/// Build the transport named by the configuration.
pub fn transport_from_kind(kind: TransportKind, use_system_proxy: bool) -> Result<Arc<dyn Transport>, FetchError> {
    let http = || {
        if use_system_proxy {
            HttpTransport::new()
        } else {
            HttpTransport::direct()
        }
    };
    let blocking = || {
        if use_system_proxy {
            BlockingHttpTransport::new()
        } else {
            BlockingHttpTransport::direct()
        }
    };

    let transport: Arc<dyn Transport> = match kind {
        TransportKind::Async => Arc::new(http()?),
        TransportKind::Blocking => Arc::new(blocking()),
        TransportKind::Fallback => Arc::new(FallbackTransport::new(Box::new(http()?), Box::new(blocking()))),
    };
    Ok(transport)
}

// =============================================================================
// Fetcher
// =============================================================================

/// A transport bound to one list URL and timeout.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    url: String,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport,
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, FetchError> {
        let transport = transport_from_kind(config.transport, config.use_system_proxy)?;
        Ok(Self::new(transport, config.list_url.clone(), config.fetch_timeout()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Single attempt; failures are logged and returned.
    pub async fn fetch(&self) -> Result<String, FetchError> {
        log::info!("fetching filter list from {}", self.url);
        match self.transport.get(&self.url, self.timeout).await {
            Ok(text) => {
                log::debug!("fetched {} bytes from {}", text.len(), self.url);
                Ok(text)
            }
            Err(e) => {
                log::warn!("failed to fetch filter list from {}: {}", self.url, e);
                Err(e)
            }
        }
    }
}
