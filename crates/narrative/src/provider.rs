use crate::bundle::Bundle;
use crate::entry::{NarrativeEntry, Stages};
use crate::error::{NarrativeError, Result};
use crate::key::{bundle_file_name, NarrativeKey};
use async_trait::async_trait;
use haqei_iching::{HexagramId, LineRef, PathSignature};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Where bundle bytes come from
#[async_trait]
pub trait BundleSource: Send + Sync {
    /// Raw contents of the bundle for `hexagram` under `root`
    async fn fetch(&self, root: &Path, hexagram: HexagramId) -> Result<Vec<u8>>;
}

/// Reads `{root}/hex-{N}.json` from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FsBundleSource;

#[async_trait]
impl BundleSource for FsBundleSource {
    async fn fetch(&self, root: &Path, hexagram: HexagramId) -> Result<Vec<u8>> {
        let path = root.join(bundle_file_name(hexagram));
        tokio::fs::read(&path)
            .await
            .map_err(|e| NarrativeError::bundle_load(hexagram.get(), format!("{}: {e}", path.display())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Directory holding the standard `hex-{N}.json` bundles
    pub bundle_root: PathBuf,
    /// Directory tried first; falls back to `bundle_root`
    #[serde(default)]
    pub easy_bundle_root: Option<PathBuf>,
    /// Prefer an entry's plain-language variant when it has one
    #[serde(default)]
    pub prefer_easy: bool,
}

impl ProviderConfig {
    pub fn new(bundle_root: impl Into<PathBuf>) -> Self {
        Self {
            bundle_root: bundle_root.into(),
            easy_bundle_root: None,
            prefer_easy: false,
        }
    }

    #[must_use]
    pub fn with_easy_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.easy_bundle_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn prefer_easy(mut self, prefer: bool) -> Self {
        self.prefer_easy = prefer;
        self
    }

    /// Roots in lookup order
    fn roots(&self) -> impl Iterator<Item = &Path> {
        self.easy_bundle_root
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.bundle_root.as_path()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Easy,
    Default,
}

/// An entry with its display fields chosen by the preference policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEntry {
    pub key: NarrativeKey,
    pub variant: Variant,
    pub headline: String,
    pub stages: Stages,
    pub why: Option<String>,
    pub caution: Option<String>,
    pub outcome: Option<String>,
    pub next3: Vec<String>,
    pub entry: NarrativeEntry,
}

impl ResolvedEntry {
    /// Pick display fields; easy fields win when preferred, each falling back
    /// to the default text when empty
    #[must_use]
    pub fn resolve(key: NarrativeKey, entry: &NarrativeEntry, prefer_easy: bool) -> Self {
        let easy = entry.easy.as_ref().filter(|_| prefer_easy);
        let Some(easy) = easy else {
            return Self {
                key,
                variant: Variant::Default,
                headline: entry.headline.clone(),
                stages: entry.stages.clone(),
                why: entry.why.clone(),
                caution: entry.caution.clone(),
                outcome: entry.outcome.clone(),
                next3: Vec::new(),
                entry: entry.clone(),
            };
        };

        let pick = |easy: &str, fallback: &Option<String>| {
            non_empty(easy).map(str::to_string).or_else(|| fallback.clone())
        };

        Self {
            key,
            variant: Variant::Easy,
            headline: non_empty(&easy.headline)
                .unwrap_or(entry.headline.as_str())
                .to_string(),
            stages: easy
                .stages
                .clone()
                .filter(Stages::is_complete)
                .unwrap_or_else(|| entry.stages.clone()),
            why: pick(&easy.why, &entry.why),
            caution: pick(&easy.caution, &entry.caution),
            outcome: pick(&easy.outcome, &entry.outcome),
            next3: easy.next3.clone(),
            entry: entry.clone(),
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Snapshot of provider counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    /// Loads that went to the source
    pub loads: u64,
    /// Cache hits with a bundle
    pub hits: u64,
    /// Cache hits on a remembered failure
    pub negative_hits: u64,
    /// Calls that waited on another caller's in-flight load
    pub coalesced: u64,
}

#[derive(Default)]
struct Counters {
    loads: AtomicU64,
    hits: AtomicU64,
    negative_hits: AtomicU64,
    coalesced: AtomicU64,
}

/// `None` while the load is in flight, `Some(result)` once settled
type Settled = Option<Option<Arc<Bundle>>>;

#[derive(Default)]
struct State {
    /// `None` values remember a failed load
    cache: HashMap<HexagramId, Option<Arc<Bundle>>>,
    /// In-flight loads tagged with the generation that started them
    pending: HashMap<HexagramId, (u64, watch::Receiver<Settled>)>,
    /// Bumped by every cache clear
    generation: u64,
}

impl State {
    /// Drop the pending slot only if it still belongs to `generation`
    fn release(&mut self, hexagram: HexagramId, generation: u64) {
        if self.pending.get(&hexagram).is_some_and(|(g, _)| *g == generation) {
            self.pending.remove(&hexagram);
        }
    }
}

enum Role {
    Leader(watch::Sender<Settled>, u64),
    Follower(watch::Receiver<Settled>),
}

/// Clears the pending slot if the leading load is dropped before it settles
struct PendingGuard<'a> {
    state: &'a Mutex<State>,
    hexagram: HexagramId,
    generation: u64,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.release(self.hexagram, self.generation);
            log::debug!("Load of hexagram {} abandoned before settling", self.hexagram);
        }
    }
}

/// Lazily loads and caches per-hexagram bundles and resolves entries from them
pub struct ScenarioDbProvider {
    config: ProviderConfig,
    source: Arc<dyn BundleSource>,
    state: Mutex<State>,
    counters: Counters,
}

impl ScenarioDbProvider {
    pub fn new(config: ProviderConfig, source: Arc<dyn BundleSource>) -> Self {
        Self {
            config,
            source,
            state: Mutex::new(State::default()),
            counters: Counters::default(),
        }
    }

    /// Provider reading bundles from the filesystem
    pub fn from_fs(config: ProviderConfig) -> Self {
        Self::new(config, Arc::new(FsBundleSource))
    }

    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bundle for `hexagram`, or `None` if no root has a valid one.
    ///
    /// Results (including failures) are cached until [`clear_cache`](Self::clear_cache).
    /// Concurrent calls share one load.
    pub async fn load_bundle(&self, hexagram: HexagramId) -> Option<Arc<Bundle>> {
        loop {
            let role = {
                let mut state = self.lock();
                if let Some(cached) = state.cache.get(&hexagram) {
                    let counter = if cached.is_some() {
                        &self.counters.hits
                    } else {
                        &self.counters.negative_hits
                    };
                    counter.fetch_add(1, Ordering::Relaxed);
                    return cached.clone();
                }
                if let Some((_, rx)) = state.pending.get(&hexagram) {
                    Role::Follower(rx.clone())
                } else {
                    let (tx, rx) = watch::channel(None);
                    let generation = state.generation;
                    state.pending.insert(hexagram, (generation, rx));
                    Role::Leader(tx, generation)
                }
            };

            match role {
                Role::Leader(tx, generation) => return self.lead(hexagram, tx, generation).await,
                Role::Follower(mut rx) => {
                    self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    match rx.wait_for(Option::is_some).await {
                        Ok(settled) => return (*settled).clone().flatten(),
                        Err(_) => {
                            log::debug!("In-flight load of hexagram {hexagram} went away; retrying");
                        }
                    }
                }
            }
        }
    }

    async fn lead(
        &self,
        hexagram: HexagramId,
        tx: watch::Sender<Settled>,
        generation: u64,
    ) -> Option<Arc<Bundle>> {
        let guard = PendingGuard {
            state: &self.state,
            hexagram,
            generation,
            armed: true,
        };
        self.counters.loads.fetch_add(1, Ordering::Relaxed);

        let result = self.fetch_from_roots(hexagram).await.map(Arc::new);
        {
            let mut state = self.lock();
            if state.generation == generation {
                state.cache.insert(hexagram, result.clone());
            } else {
                log::debug!("Cache cleared while loading hexagram {hexagram}; result not cached");
            }
            state.release(hexagram, generation);
        }
        guard.disarm();
        tx.send_replace(Some(result.clone()));
        result
    }

    async fn fetch_from_roots(&self, hexagram: HexagramId) -> Option<Bundle> {
        for root in self.config.roots() {
            let loaded = match self.source.fetch(root, hexagram).await {
                Ok(bytes) => Bundle::from_slice(&bytes, hexagram),
                Err(e) => Err(e),
            };
            match loaded {
                Ok(bundle) => {
                    log::debug!(
                        "Loaded hexagram {hexagram} bundle from {} ({} items)",
                        root.display(),
                        bundle.len()
                    );
                    return Some(bundle);
                }
                Err(e) => log::warn!(
                    "Bundle for hexagram {hexagram} unavailable under {}: {e}",
                    root.display()
                ),
            }
        }
        None
    }

    /// Curated entry for `(line, signature)`; placeholders count as absent
    pub async fn get(&self, line: LineRef, signature: PathSignature) -> Option<ResolvedEntry> {
        let bundle = self.load_bundle(line.hexagram).await?;
        self.resolve(&bundle, line, signature)
    }

    /// All entries starting at `line`, in signature order, skipping missing ones
    pub async fn get_all_for_start(&self, line: LineRef) -> Vec<ResolvedEntry> {
        let Some(bundle) = self.load_bundle(line.hexagram).await else {
            return Vec::new();
        };
        PathSignature::ALL
            .into_iter()
            .filter_map(|sig| self.resolve(&bundle, line, sig))
            .collect()
    }

    fn resolve(&self, bundle: &Bundle, line: LineRef, signature: PathSignature) -> Option<ResolvedEntry> {
        let entry = bundle.get(line.position, signature)?;
        if entry.placeholder {
            log::debug!("Entry {line} {signature} is still a placeholder");
            return None;
        }
        Some(ResolvedEntry::resolve(
            NarrativeKey::new(line, signature),
            entry,
            self.config.prefer_easy,
        ))
    }

    /// Forget cached bundles and remembered failures.
    ///
    /// Loads already in flight still answer their callers but are not cached;
    /// later calls start fresh loads.
    pub fn clear_cache(&self) {
        let mut state = self.lock();
        let dropped = state.cache.len();
        state.cache.clear();
        state.pending.clear();
        state.generation += 1;
        log::debug!("Cleared {dropped} cached bundle results");
    }

    #[must_use]
    pub fn stats(&self) -> ProviderStats {
        ProviderStats {
            loads: self.counters.loads.load(Ordering::Relaxed),
            hits: self.counters.hits.load(Ordering::Relaxed),
            negative_hits: self.counters.negative_hits.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ScenarioDbProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioDbProvider")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
