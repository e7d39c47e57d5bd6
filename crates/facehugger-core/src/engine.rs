use crate::concurrency::shutdown_requested;
use crate::delta::CacheDelta;
use crate::execute::execute_until;
use crate::plan::{build_plan, Operation, Plan};
use crate::reconcile::{reconcile, ResolutionMode, ResolvedEntry};
use crate::CoreError;
use facehugger_hub::{select_backend, RetrievalBackend};
use facehugger_schema::{
    parse_manifest_file, CacheSnapshot, LockEntry, LockFile, RepoId,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_MANIFEST_FILE: &str = "facehugger.yaml";
pub const DEFAULT_LOCK_FILE: &str = "facehugger.lock";

/// Drives one manifest through reconcile, plan, execute and report against a
/// retrieval backend.
pub struct Engine {
    backend: Arc<dyn RetrievalBackend>,
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub frozen: bool,
    pub dry_run: bool,
    /// Explicit lock file. When unset, `facehugger.lock` next to the manifest
    /// is used if it exists.
    pub lock_path: Option<PathBuf>,
    pub write_lock: bool,
}

impl SyncOptions {
    pub fn mode(&self) -> ResolutionMode {
        ResolutionMode::from_frozen(self.frozen)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.write_lock && self.frozen {
            return Err(CoreError::InvalidOptions(
                "--write-lock cannot be combined with --frozen".to_owned(),
            ));
        }
        if self.write_lock && self.dry_run {
            return Err(CoreError::InvalidOptions(
                "--write-lock cannot be combined with --dry-run".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Everything decided before the first backend call.
#[derive(Debug, Clone, Serialize)]
pub struct Prepared {
    pub manifest: PathBuf,
    pub lock: Option<PathBuf>,
    pub mode: ResolutionMode,
    pub dry_run: bool,
    pub resolved: Vec<ResolvedEntry>,
    pub plan: Plan,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    #[serde(flatten)]
    pub prepared: Prepared,
    pub executed: Vec<Operation>,
    pub before: CacheSnapshot,
    pub after: CacheSnapshot,
    pub delta: CacheDelta,
    pub lock_written: Option<PathBuf>,
}

impl Engine {
    pub fn new(backend: Arc<dyn RetrievalBackend>) -> Self {
        Self { backend }
    }

    /// Build an engine over a backend chosen by name (`hf` or `mock`).
    pub fn with_backend(name: &str) -> Result<Self, CoreError> {
        Ok(Self::new(Arc::from(select_backend(name)?)))
    }

    pub fn backend(&self) -> &dyn RetrievalBackend {
        self.backend.as_ref()
    }

    /// Parse, reconcile and plan. Performs no backend calls, so every input
    /// error surfaces here before anything is retrieved.
    pub fn prepare(
        &self,
        manifest_path: &Path,
        options: &SyncOptions,
    ) -> Result<Prepared, CoreError> {
        options.validate()?;

        let manifest = parse_manifest_file(manifest_path)?;
        debug!(
            "{} model(s) in {}",
            manifest.models.len(),
            manifest_path.display()
        );

        let lock = load_lock(manifest_path, options.lock_path.as_deref())?;
        let mode = options.mode();
        let resolved = reconcile(&manifest, lock.as_ref().map(|(_, l)| l), mode)?;
        let plan = build_plan(&resolved, options.dry_run);

        Ok(Prepared {
            manifest: manifest_path.to_path_buf(),
            lock: lock.map(|(path, _)| path),
            mode,
            dry_run: options.dry_run,
            resolved,
            plan,
        })
    }

    pub fn sync(
        &self,
        manifest_path: &Path,
        options: &SyncOptions,
    ) -> Result<SyncReport, CoreError> {
        let prepared = self.prepare(manifest_path, options)?;
        self.run(prepared, options)
    }

    /// Snapshot the cache, execute a prepared plan, snapshot again, and write
    /// the lock file when asked to.
    pub fn run(
        &self,
        prepared: Prepared,
        options: &SyncOptions,
    ) -> Result<SyncReport, CoreError> {
        let before = self.snapshot()?;
        debug!("{} cached revision(s) before sync", before.len());

        let executed = execute_until(&prepared.plan, self.backend(), shutdown_requested)?;

        let after = self.snapshot()?;
        let delta = CacheDelta::between(&before, &after);
        info!(
            "{} operation(s) executed, {} revision(s) added, {} removed",
            executed.len(),
            delta.added.len(),
            delta.removed.len()
        );

        let lock_written = if options.write_lock {
            let path = options
                .lock_path
                .clone()
                .unwrap_or_else(|| default_lock_path(&prepared.manifest));
            let lock = lock_from_snapshot(&prepared.resolved, &after)?;
            lock.write_to_file(&path)?;
            info!("wrote {} lock entries to {}", lock.len(), path.display());
            Some(path)
        } else {
            None
        };

        Ok(SyncReport {
            prepared,
            executed,
            before,
            after,
            delta,
            lock_written,
        })
    }

    fn snapshot(&self) -> Result<CacheSnapshot, CoreError> {
        self.backend.list_snapshot().map_err(CoreError::Snapshot)
    }
}

pub fn default_lock_path(manifest_path: &Path) -> PathBuf {
    manifest_path.with_file_name(DEFAULT_LOCK_FILE)
}

fn load_lock(
    manifest_path: &Path,
    explicit: Option<&Path>,
) -> Result<Option<(PathBuf, LockFile)>, CoreError> {
    let path = match explicit {
        Some(path) if !path.is_file() => {
            return Err(CoreError::LockFileNotFound(path.display().to_string()));
        }
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_lock_path(manifest_path);
            if !path.is_file() {
                debug!("no lock file at {}", path.display());
                return Ok(None);
            }
            path
        }
    };
    let lock = LockFile::read_from_file(&path)?;
    debug!("{} lock entries from {}", lock.len(), path.display());
    Ok(Some((path, lock)))
}

/// Pin each resolved repository to the cached revision it now resolves to.
/// The manifest ref is recorded alongside the cache's own refs, so a commit
/// hash pin stays attested. A repository listed more than once must land on
/// a single revision; its refs are merged into one entry.
fn lock_from_snapshot(
    resolved: &[ResolvedEntry],
    snapshot: &CacheSnapshot,
) -> Result<LockFile, CoreError> {
    let mut index: HashMap<&RepoId, usize> = HashMap::new();
    let mut entries: Vec<LockEntry> = Vec::new();
    for entry in resolved {
        let cached = snapshot
            .for_repo(&entry.repo)
            .find(|c| c.revision == entry.revision || c.refs.contains(entry.revision.as_str()))
            .ok_or_else(|| CoreError::NotCached {
                repo: entry.repo.to_string(),
                revision: entry.revision.to_string(),
            })?;
        let mut pinned = LockEntry::from(cached.clone());
        if let Some(requested) = &entry.requested {
            pinned.refs.insert(requested.to_string());
        }

        match index.get(&entry.repo).copied() {
            Some(at) => {
                let existing = &mut entries[at];
                if existing.resolved_revision != pinned.resolved_revision {
                    return Err(CoreError::ConflictingPins {
                        repo: entry.repo.to_string(),
                        first: existing.resolved_revision.to_string(),
                        second: pinned.resolved_revision.to_string(),
                    });
                }
                existing.refs.extend(pinned.refs);
            }
            None => {
                index.insert(&entry.repo, entries.len());
                entries.push(pinned);
            }
        }
    }
    Ok(LockFile::from_entries(entries)?)
}
