//! On-disk filter list cache
//!
//! The cache is a single text file; its modification time is its age.
//! Fresh means younger than the TTL. Only a successful fetch writes it.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use lg_compiler::{optimize_rules, parse_with_stats, ParseStats};
use lg_core::RuleSet;

use crate::config::SyncConfig;
use crate::error::CacheError;
use crate::fetcher::Fetcher;

/// Where an installed rule set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    /// Cache younger than the TTL; no network call made
    FreshCache,
    /// Downloaded just now
    Network,
    /// Fetch failed; the existing cache file was used regardless of age
    StaleCache,
}

/// A compiled rule set plus how it was obtained.
#[derive(Debug, Clone)]
pub struct LoadedRules {
    pub rules: RuleSet,
    pub stats: ParseStats,
    pub source: RuleSource,
}

pub struct RuleCache {
    path: PathBuf,
    ttl: Duration,
}

impl RuleCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.cache_path.clone(), config.ttl())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Age of the cache file, or `None` if there is none.
    ///
    /// A modification time in the future counts as age zero.
    pub async fn age(&self) -> io::Result<Option<Duration>> {
        let age = self
            .modified()
            .await?
            .map(|modified| SystemTime::now().duration_since(modified).unwrap_or(Duration::ZERO));
        Ok(age)
    }

    /// Modification time of the cache file, or `None` if there is none.
    pub async fn modified(&self) -> io::Result<Option<SystemTime>> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(Some(metadata.modified()?))
    }

    pub async fn is_fresh(&self) -> io::Result<bool> {
        Ok(matches!(self.age().await?, Some(age) if age < self.ttl))
    }

    /// Produce a rule set from the cache, the network, or both.
    ///
    /// Without `force`, a fresh cache is parsed without touching the
    /// network. Otherwise a fetch is attempted; on success the text is
    /// persisted and parsed. On failure an existing cache file of any age
    /// is used, and only when there is none does this fail.
    pub async fn ensure_fresh(&self, fetcher: &Fetcher, force: bool) -> Result<LoadedRules, CacheError> {
        let age = self.age().await?;

        if !force {
            if let Some(age) = age {
                if age < self.ttl {
                    log::debug!(
                        "cache {} is fresh ({}s old, ttl {}s)",
                        self.path.display(),
                        age.as_secs(),
                        self.ttl.as_secs()
                    );
                    return self.load_cached(RuleSource::FreshCache).await;
                }
                log::debug!("cache {} is stale ({}s old)", self.path.display(), age.as_secs());
            } else {
                log::debug!("no cache at {}", self.path.display());
            }
        }

        match fetcher.fetch().await {
            Ok(text) => {
                if let Err(e) = self.persist(&text).await {
                    log::warn!("failed to write cache {}: {}", self.path.display(), e);
                }
                Ok(compile(&text, RuleSource::Network))
            }
            Err(e) => {
                if self.age().await?.is_some() {
                    log::warn!("using cached filter list {} after fetch failure", self.path.display());
                    self.load_cached(RuleSource::StaleCache).await
                } else {
                    Err(CacheError::Unavailable { source: e })
                }
            }
        }
    }

    async fn load_cached(&self, source: RuleSource) -> Result<LoadedRules, CacheError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(compile(&text, source))
    }

    /// Write through a sibling temp file so readers never see a partial list.
    async fn persist(&self, text: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut tmp: OsString = self.path.clone().into_os_string();
        tmp.push(".part");
        let tmp = PathBuf::from(tmp);

        let result = match tokio::fs::write(&tmp, text).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.path).await,
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!("failed to remove {}: {}", tmp.display(), e);
                }
            }
        }

        result
    }
}

fn compile(text: &str, source: RuleSource) -> LoadedRules {
    let (mut rules, stats) = parse_with_stats(text);
    let optimized = optimize_rules(&mut rules);
    if optimized.deduped > 0 {
        log::debug!("removed {} duplicate rules", optimized.deduped);
    }
    LoadedRules { rules, stats, source }
}
