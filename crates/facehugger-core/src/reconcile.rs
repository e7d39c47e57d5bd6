use crate::CoreError;
use facehugger_schema::{LockEntry, LockFile, Manifest, ModelEntry, RepoId, Revision};
use serde::Serialize;
use tracing::{debug, warn};

/// Whether resolution may fall back to refs the lock file does not pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    #[default]
    Unfrozen,
    /// Every entry must be satisfiable from the lock file.
    Frozen,
}

impl ResolutionMode {
    pub fn from_frozen(frozen: bool) -> Self {
        if frozen {
            ResolutionMode::Frozen
        } else {
            ResolutionMode::Unfrozen
        }
    }

    pub fn is_frozen(self) -> bool {
        self == ResolutionMode::Frozen
    }
}

/// Why a revision was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionSource {
    ExplicitRef,
    LockedRevision,
    DefaultRef,
}

/// A manifest entry with the exact revision to request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntry {
    pub repo: RepoId,
    /// Ref written in the manifest, if any.
    pub requested: Option<Revision>,
    pub revision: Revision,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub source: RevisionSource,
}

impl ResolvedEntry {
    fn new(entry: &ModelEntry, revision: Revision, source: RevisionSource) -> Self {
        Self {
            repo: entry.repo.clone(),
            requested: entry.revision_ref.clone(),
            revision,
            include: entry.include.clone(),
            exclude: entry.exclude.clone(),
            source,
        }
    }
}

/// Resolve every manifest entry, in manifest order. The first failure aborts
/// the whole reconciliation.
pub fn reconcile(
    manifest: &Manifest,
    lock: Option<&LockFile>,
    mode: ResolutionMode,
) -> Result<Vec<ResolvedEntry>, CoreError> {
    manifest
        .models
        .iter()
        .map(|entry| {
            let locked = lock.and_then(|l| l.get(&entry.repo));
            resolve_entry(entry, locked, mode)
        })
        .collect()
}

pub fn resolve_entry(
    entry: &ModelEntry,
    locked: Option<&LockEntry>,
    mode: ResolutionMode,
) -> Result<ResolvedEntry, CoreError> {
    if let Some(locked) = locked {
        match &entry.revision_ref {
            Some(wanted) if !locked.attests(wanted) => {
                if mode.is_frozen() {
                    return Err(CoreError::LockDrift {
                        repo: entry.repo.to_string(),
                        requested: wanted.to_string(),
                        attested: locked
                            .refs
                            .iter()
                            .map(String::as_str)
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }
                warn!(
                    "{}: ref '{wanted}' is not pinned by the lock file (locked at {}); using the ref",
                    entry.repo, locked.resolved_revision
                );
            }
            _ => {
                debug!(
                    "{}: locked at {}",
                    entry.repo, locked.resolved_revision
                );
                return Ok(ResolvedEntry::new(
                    entry,
                    locked.resolved_revision.clone(),
                    RevisionSource::LockedRevision,
                ));
            }
        }
    } else if mode.is_frozen() {
        return Err(CoreError::MissingLockEntry {
            repo: entry.repo.to_string(),
        });
    }

    Ok(match &entry.revision_ref {
        Some(wanted) => ResolvedEntry::new(entry, wanted.clone(), RevisionSource::ExplicitRef),
        None => ResolvedEntry::new(entry, Revision::default_branch(), RevisionSource::DefaultRef),
    })
}
