//! ListGuard Sync
//!
//! Keeps the engine's rule set current without blocking the request path:
//! a background worker fetches the filter list, caches it on disk with a
//! TTL, compiles it and swaps it into the [`Engine`].
//!
//! # Example
//!
//! ```no_run
//! use lg_sync::{RefreshWorker, SyncConfig};
//!
//! # async fn host() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::default();
//! let (engine, worker) = RefreshWorker::from_config(&config)?;
//!
//! // Request hook, any thread:
//! if engine.should_block("https://ads.example.com/banner.js") {
//!     // abort the request
//! }
//!
//! // Management UI:
//! worker.handle().reload();
//! worker.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! [`Engine`]: lg_core::Engine

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod refresh;

#[cfg(test)]
mod test_support;

pub use cache::{LoadedRules, RuleCache, RuleSource};
pub use config::{SyncConfig, TransportKind};
pub use error::{CacheError, ConfigError, FetchError, RefreshError};
pub use fetcher::{BlockingHttpTransport, FallbackTransport, Fetcher, HttpTransport, Transport};
pub use refresh::{RefreshHandle, RefreshWorker, Refresher, ReloadRequest, RulesLoaded};
