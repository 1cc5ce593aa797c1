//! Background refresh of the active rule set
//!
//! ```text
//! RefreshWorker task
//!   initial load ──┐
//!   manual reload ─┼─> Refresher::refresh() -> RuleCache::ensure_fresh() -> Engine::install()
//!   periodic tick ─┘
//! ```
//!
//! The request path only ever touches `Engine::classify`; all I/O happens
//! on the worker task. One cycle runs at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use lg_core::{Engine, RuleCounts};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::cache::{RuleCache, RuleSource};
use crate::config::SyncConfig;
use crate::error::{CacheError, FetchError, RefreshError};
use crate::fetcher::Fetcher;

// =============================================================================
// Refresher
// =============================================================================

/// Readiness notification sent after every install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulesLoaded {
    pub counts: RuleCounts,
    pub source: RuleSource,
    pub generation: u64,
}

/// Runs refresh cycles and installs their result into the engine.
pub struct Refresher {
    engine: Arc<Engine>,
    cache: RuleCache,
    fetcher: Fetcher,
    in_progress: AtomicBool,
    /// Cache mtime behind the installed rules
    installed_mtime: Mutex<Option<SystemTime>>,
    loaded: watch::Sender<Option<RulesLoaded>>,
}

impl Refresher {
    pub fn new(engine: Arc<Engine>, cache: RuleCache, fetcher: Fetcher) -> Self {
        let (loaded, _) = watch::channel(None);
        Self {
            engine,
            cache,
            fetcher,
            in_progress: AtomicBool::new(false),
            installed_mtime: Mutex::new(None),
            loaded,
        }
    }

    pub fn from_config(engine: Arc<Engine>, config: &SyncConfig) -> Result<Self, FetchError> {
        let fetcher = Fetcher::from_config(config)?;
        Ok(Self::new(engine, RuleCache::from_config(config), fetcher))
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Receive the latest `RulesLoaded`; `None` until the first install.
    pub fn subscribe(&self) -> watch::Receiver<Option<RulesLoaded>> {
        self.loaded.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Run one cycle. `force` bypasses the cache TTL.
    ///
    /// On failure the previously installed rules stay in force.
    pub async fn refresh(&self, force: bool) -> Result<RulesLoaded, RefreshError> {
        let Some(guard) = InProgress::acquire(&self.in_progress) else {
            log::debug!("refresh requested while another is running");
            return Err(RefreshError::AlreadyRunning);
        };

        let loaded = match self.cache.ensure_fresh(&self.fetcher, force).await {
            Ok(loaded) => loaded,
            Err(e) => {
                log::warn!("filter refresh failed, keeping current rules: {}", e);
                return Err(e.into());
            }
        };

        let counts = loaded.rules.counts();
        let generation = self.engine.install(loaded.rules);
        let mtime = self.cache.modified().await.ok().flatten();
        self.set_installed_mtime(mtime);
        log::info!(
            "loaded {} block rules, {} exceptions from {:?}",
            counts.block,
            counts.exception,
            loaded.source
        );

        let event = RulesLoaded {
            counts,
            source: loaded.source,
            generation,
        };
        // Subscribers may reload as soon as they hear about this install
        drop(guard);
        self.loaded.send_replace(Some(event));
        Ok(event)
    }

    /// Periodic staleness check.
    ///
    /// Returns `Ok(None)` without reinstalling when rules are loaded and the
    /// cache is still fresh and unchanged since the last install.
    pub async fn check(&self) -> Result<Option<RulesLoaded>, RefreshError> {
        if self.engine.is_loaded() && self.cache.is_fresh().await.map_err(CacheError::from)? {
            let modified = self.cache.modified().await.map_err(CacheError::from)?;
            if modified.is_some() && modified == self.installed_mtime() {
                log::debug!("cache {} unchanged, keeping current rules", self.cache.path().display());
                return Ok(None);
            }
        }

        self.refresh(false).await.map(Some)
    }

    fn installed_mtime(&self) -> Option<SystemTime> {
        *self.installed_mtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_installed_mtime(&self, mtime: Option<SystemTime>) {
        *self.installed_mtime.lock().unwrap_or_else(PoisonError::into_inner) = mtime;
    }
}

/// Holds the in-progress flag for the lifetime of one cycle.
struct InProgress<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InProgress<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// =============================================================================
// Worker
// =============================================================================

enum Command {
    Reload {
        reply: Option<oneshot::Sender<Result<RulesLoaded, RefreshError>>>,
    },
}

/// Outcome of a non-blocking reload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadRequest {
    Queued,
    AlreadyRunning,
    WorkerStopped,
}

/// Host-facing handle for manual reloads and readiness.
#[derive(Clone)]
pub struct RefreshHandle {
    refresher: Arc<Refresher>,
    commands: mpsc::Sender<Command>,
}

impl RefreshHandle {
    pub fn engine(&self) -> &Arc<Engine> {
        self.refresher.engine()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RulesLoaded>> {
        self.refresher.subscribe()
    }

    /// Ask the worker for a forced reload without waiting for it.
    pub fn reload(&self) -> ReloadRequest {
        if self.refresher.is_refreshing() {
            return ReloadRequest::AlreadyRunning;
        }

        match self.commands.try_send(Command::Reload { reply: None }) {
            Ok(()) => ReloadRequest::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => ReloadRequest::AlreadyRunning,
            Err(mpsc::error::TrySendError::Closed(_)) => ReloadRequest::WorkerStopped,
        }
    }

    /// Forced reload, waiting for the cycle to finish.
    pub async fn reload_and_wait(&self) -> Result<RulesLoaded, RefreshError> {
        if self.refresher.is_refreshing() {
            return Err(RefreshError::AlreadyRunning);
        }

        let (reply, result) = oneshot::channel();
        match self.commands.try_send(Command::Reload { reply: Some(reply) }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => return Err(RefreshError::AlreadyRunning),
            Err(mpsc::error::TrySendError::Closed(_)) => return Err(RefreshError::WorkerStopped),
        }

        result.await.map_err(|_| RefreshError::WorkerStopped)?
    }
}

/// The single background task that owns all refresh I/O.
pub struct RefreshWorker {
    handle: RefreshHandle,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RefreshWorker {
    /// Spawn the worker. It performs the initial load immediately, then
    /// re-checks staleness every `check_interval`.
    pub fn start(refresher: Arc<Refresher>, check_interval: Duration) -> Self {
        let (commands, receiver) = mpsc::channel(1);
        let (shutdown, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run(Arc::clone(&refresher), receiver, shutdown_rx, check_interval));

        Self {
            handle: RefreshHandle { refresher, commands },
            shutdown: Some(shutdown),
            task,
        }
    }

    /// Build engine, refresher and worker from configuration.
    pub fn from_config(config: &SyncConfig) -> Result<(Arc<Engine>, Self), FetchError> {
        let engine = Arc::new(Engine::new());
        let refresher = Arc::new(Refresher::from_config(Arc::clone(&engine), config)?);
        Ok((engine, Self::start(refresher, config.check_interval())))
    }

    pub fn handle(&self) -> RefreshHandle {
        self.handle.clone()
    }

    /// Stop after any in-flight cycle completes.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            log::warn!("refresh worker ended abnormally: {}", e);
        }
    }
}

async fn run(
    refresher: Arc<Refresher>,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown: oneshot::Receiver<()>,
    check_interval: Duration,
) {
    let _ = refresher.refresh(false).await;

    let mut ticker = tokio::time::interval_at(Instant::now() + check_interval, check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            command = commands.recv() => match command {
                Some(Command::Reload { reply }) => {
                    let result = refresher.refresh(true).await;
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                let _ = refresher.check().await;
            }
        }
    }

    log::debug!("refresh worker stopped");
}
