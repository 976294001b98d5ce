//! Git status cache.
//!
//! Every fetch takes a generation number at entry; a result is only made visible
//! when its caller still holds the newest generation, so a slow query can never
//! overwrite a faster, later one. Concurrent fetches for the same root share one
//! underlying query. A forced fetch that arrives while a query is running waits
//! for it and then runs exactly one more, so changes made mid-query are seen.

use super::provider::GitProvider;
use super::status::GitStatusMap;
use crate::debounce::Debounce;
use crate::error::GitError;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle of the cache as seen by renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePhase {
    Idle,
    Fetching,
    Disabled,
}

/// Result of one [`GitStatusCache::fetch`] call.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub map: Arc<GitStatusMap>,
    pub enabled: bool,
    /// False when a newer fetch superseded this one and the result was discarded.
    pub applied: bool,
    pub generation: u64,
}

/// Point-in-time view of the cache.
#[derive(Debug, Clone)]
pub struct GitSnapshot {
    pub map: Arc<GitStatusMap>,
    pub enabled: bool,
    pub phase: CachePhase,
    pub generation: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
enum QueryResult {
    Ready(Arc<GitStatusMap>),
    NotRepository,
    Failed(GitError),
}

#[derive(Debug, Clone)]
struct Flight {
    /// Generation counter value when the query started.
    started_at: u64,
    result: QueryResult,
}

type SharedFlight = Shared<BoxFuture<'static, Flight>>;

struct InFlight {
    id: u64,
    future: SharedFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    NotRepository,
    Failed,
}

struct CacheState {
    generation: u64,
    next_flight_id: u64,
    visible: Arc<GitStatusMap>,
    enabled: bool,
    admin_enabled: bool,
    phase: CachePhase,
    last_error: Option<String>,
    current_root: Option<PathBuf>,
    in_flight: HashMap<PathBuf, InFlight>,
    memo: HashMap<PathBuf, Arc<GitStatusMap>>,
    verdicts: HashMap<PathBuf, Verdict>,
    refresh: Debounce,
    queries: u64,
}

/// Shared, cloneable handle to the cache.
#[derive(Clone)]
pub struct GitStatusCache {
    provider: Arc<dyn GitProvider>,
    state: Arc<Mutex<CacheState>>,
}

impl GitStatusCache {
    pub fn new(provider: Arc<dyn GitProvider>, debounce: Duration, max_wait: Duration) -> Self {
        Self {
            provider,
            state: Arc::new(Mutex::new(CacheState {
                generation: 0,
                next_flight_id: 0,
                visible: Arc::new(GitStatusMap::new()),
                enabled: false,
                admin_enabled: true,
                phase: CachePhase::Idle,
                last_error: None,
                current_root: None,
                in_flight: HashMap::new(),
                memo: HashMap::new(),
                verdicts: HashMap::new(),
                refresh: Debounce::new(debounce, max_wait),
                queries: 0,
            })),
        }
    }

    pub fn from_config(provider: Arc<dyn GitProvider>, config: &crate::config::GitConfig) -> Self {
        let cache = Self::new(provider, config.debounce(), config.max_wait());
        cache.set_admin_enabled(config.enabled);
        cache
    }

    /// Fetch status for `root`, joining a running query when possible.
    ///
    /// Non-forced calls are served from the memo when one exists. A root known not
    /// to be a repository stays disabled until it changes or is invalidated; a
    /// root whose last query failed stays disabled until a forced fetch.
    pub async fn fetch(&self, root: &Path, force: bool) -> FetchOutcome {
        let root = root.to_path_buf();
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            let generation = state.generation;
            if state.current_root.as_deref() != Some(root.as_path()) {
                state.current_root = Some(root.clone());
                state.verdicts.clear();
            }
            if !state.admin_enabled {
                return state.disable(generation);
            }
            match state.verdicts.get(&root).copied() {
                Some(Verdict::Failed) if force => {
                    state.verdicts.remove(&root);
                }
                Some(_) => return state.disable(generation),
                None => {}
            }
            generation
        };

        loop {
            let flight = {
                let mut state = self.state.lock();
                if let Some(existing) = state.in_flight.get(&root) {
                    existing.future.clone()
                } else if let Some(map) = state.memo.get(&root).filter(|_| !force).cloned() {
                    return state.apply(&root, generation, QueryResult::Ready(map));
                } else {
                    self.start_flight(&mut state, &root)
                }
            };
            let flight = flight.await;
            if force && flight.started_at < generation {
                debug!(
                    root = %root.display(),
                    generation,
                    started_at = flight.started_at,
                    "Joined query predates forced fetch, running follow-up"
                );
                continue;
            }
            let mut state = self.state.lock();
            return state.apply(&root, generation, flight.result);
        }
    }

    fn start_flight(&self, state: &mut CacheState, root: &Path) -> SharedFlight {
        state.next_flight_id += 1;
        state.queries += 1;
        let id = state.next_flight_id;
        let started_at = state.generation;
        let provider = Arc::clone(&self.provider);
        let shared_state = Arc::clone(&self.state);
        let flight_root = root.to_path_buf();
        let future = async move {
            let result = query(provider.as_ref(), &flight_root).await;
            let mut state = shared_state.lock();
            let registered = state
                .in_flight
                .get(&flight_root)
                .map(|f| f.id == id)
                .unwrap_or(false);
            if registered {
                state.in_flight.remove(&flight_root);
                if let QueryResult::Ready(map) = &result {
                    state.memo.insert(flight_root.clone(), Arc::clone(map));
                }
            }
            Flight { started_at, result }
        }
        .boxed()
        .shared();
        state.in_flight.insert(
            root.to_path_buf(),
            InFlight {
                id,
                future: future.clone(),
            },
        );
        state.phase = CachePhase::Fetching;
        future
    }

    /// Forget the memoized result and any verdict for `root`. A running query
    /// stays registered; forced fetches join it and then run their follow-up.
    pub fn invalidate(&self, root: &Path) {
        let mut state = self.state.lock();
        state.memo.remove(root);
        state.verdicts.remove(root);
    }

    /// Drop everything and supersede any running fetch. Used on worktree switch.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.visible = Arc::new(GitStatusMap::new());
        state.in_flight.clear();
        state.memo.clear();
        state.verdicts.clear();
        state.current_root = None;
        state.last_error = None;
        state.refresh.cancel();
        if state.phase == CachePhase::Fetching {
            state.phase = CachePhase::Idle;
        }
        debug!(generation = state.generation, "Cleared git status cache");
    }

    /// Administrative switch. Disabling supersedes running fetches.
    pub fn set_admin_enabled(&self, enabled: bool) {
        let mut state = self.state.lock();
        if state.admin_enabled == enabled {
            return;
        }
        state.admin_enabled = enabled;
        if !enabled {
            state.generation += 1;
            state.visible = Arc::new(GitStatusMap::new());
            state.enabled = false;
            state.phase = CachePhase::Disabled;
            state.refresh.cancel();
        } else {
            state.phase = CachePhase::Idle;
        }
        info!(enabled, "Git status toggled");
    }

    /// Ask for a debounced forced refresh.
    pub fn request_refresh(&self) {
        let mut state = self.state.lock();
        if state.admin_enabled {
            state.refresh.call(Instant::now());
        }
    }

    pub fn refresh_deadline(&self) -> Option<Instant> {
        self.state.lock().refresh.deadline()
    }

    /// Claim a due refresh. The caller must run it and then report
    /// [`GitStatusCache::finish_refresh`].
    pub fn begin_due_refresh(&self, now: Instant) -> bool {
        self.state.lock().refresh.poll(now)
    }

    pub fn finish_refresh(&self) {
        self.state.lock().refresh.complete();
    }

    /// Run the debounced refresh for `root` if it is due.
    pub async fn poll_refresh(&self, root: &Path) -> Option<FetchOutcome> {
        if !self.begin_due_refresh(Instant::now()) {
            return None;
        }
        let outcome = self.fetch(root, true).await;
        self.finish_refresh();
        Some(outcome)
    }

    pub fn status_map(&self) -> Arc<GitStatusMap> {
        Arc::clone(&self.state.lock().visible)
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Number of provider queries started so far.
    pub fn query_count(&self) -> u64 {
        self.state.lock().queries
    }

    pub fn snapshot(&self) -> GitSnapshot {
        let state = self.state.lock();
        GitSnapshot {
            map: Arc::clone(&state.visible),
            enabled: state.enabled,
            phase: state.phase,
            generation: state.generation,
            last_error: state.last_error.clone(),
        }
    }
}

impl CacheState {
    fn disable(&mut self, generation: u64) -> FetchOutcome {
        self.visible = Arc::new(GitStatusMap::new());
        self.enabled = false;
        self.phase = CachePhase::Disabled;
        FetchOutcome {
            map: Arc::clone(&self.visible),
            enabled: false,
            applied: true,
            generation,
        }
    }

    fn settle_phase(&mut self) {
        self.phase = if self.in_flight.is_empty() {
            CachePhase::Idle
        } else {
            CachePhase::Fetching
        };
    }

    fn apply(&mut self, root: &Path, generation: u64, result: QueryResult) -> FetchOutcome {
        let current = generation == self.generation;
        if !current {
            if self.phase == CachePhase::Fetching {
                self.settle_phase();
            }
            debug!(
                root = %root.display(),
                generation,
                latest = self.generation,
                "Discarding superseded git status result"
            );
        }
        match result {
            QueryResult::Ready(map) => {
                if current {
                    self.visible = Arc::clone(&map);
                    self.enabled = true;
                    self.last_error = None;
                    self.settle_phase();
                }
                FetchOutcome {
                    map,
                    enabled: true,
                    applied: current,
                    generation,
                }
            }
            QueryResult::NotRepository => {
                if current {
                    debug!(root = %root.display(), "Not a git repository, disabling status");
                    self.verdicts.insert(root.to_path_buf(), Verdict::NotRepository);
                    return self.disable(generation);
                }
                FetchOutcome {
                    map: Arc::new(GitStatusMap::new()),
                    enabled: false,
                    applied: false,
                    generation,
                }
            }
            QueryResult::Failed(error) => {
                if current {
                    warn!(root = %root.display(), error = %error, "Git status query failed");
                    self.verdicts.insert(root.to_path_buf(), Verdict::Failed);
                    self.visible = Arc::new(GitStatusMap::new());
                    self.enabled = false;
                    self.last_error = Some(error.to_string());
                    self.settle_phase();
                }
                FetchOutcome {
                    map: Arc::new(GitStatusMap::new()),
                    enabled: false,
                    applied: current,
                    generation,
                }
            }
        }
    }
}

async fn query(provider: &dyn GitProvider, root: &Path) -> QueryResult {
    match provider.is_repository(root).await {
        Ok(true) => {}
        Ok(false) => return QueryResult::NotRepository,
        Err(e) => return QueryResult::Failed(e),
    }
    match provider.status(root).await {
        Ok(map) => QueryResult::Ready(Arc::new(map)),
        Err(e) => QueryResult::Failed(e),
    }
}
