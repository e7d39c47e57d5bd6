use crate::backend::RetrievalBackend;
use crate::HubError;
use facehugger_schema::{CacheEntry, CacheSnapshot, FileFilter, RepoId, Revision};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// A call observed by [`MockBackend`], in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Retrieve { repo: RepoId, revision: Revision },
    Verify { repo: RepoId, revision: Revision },
    ListSnapshot,
}

#[derive(Default)]
struct MockState {
    cache: Vec<CacheEntry>,
    remote_files: HashMap<RepoId, Vec<String>>,
    fetched: HashMap<RepoId, Vec<String>>,
    fail_retrieve: HashSet<RepoId>,
    fail_verify: HashSet<RepoId>,
    calls: Vec<MockCall>,
}

/// In-memory backend with a simulated local cache.
///
/// Named refs resolve to a deterministic fake commit hash derived from the
/// repository and ref; a 40 character hex revision is taken as-is.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the local cache.
    #[must_use]
    pub fn with_cached(self, entry: CacheEntry) -> Self {
        self.lock().cache.push(entry);
        self
    }

    /// Declare the files the remote repository contains, so retrieval applies
    /// include/exclude patterns to something.
    #[must_use]
    pub fn with_files(self, repo: &str, files: &[&str]) -> Self {
        self.lock().remote_files.insert(
            RepoId::new(repo),
            files.iter().map(ToString::to_string).collect(),
        );
        self
    }

    #[must_use]
    pub fn failing_retrieve(self, repo: &str) -> Self {
        self.lock().fail_retrieve.insert(RepoId::new(repo));
        self
    }

    #[must_use]
    pub fn failing_verify(self, repo: &str) -> Self {
        self.lock().fail_verify.insert(RepoId::new(repo));
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Files selected by the last retrieval of `repo`.
    pub fn fetched_files(&self, repo: &str) -> Vec<String> {
        self.lock()
            .fetched
            .get(&RepoId::new(repo))
            .cloned()
            .unwrap_or_default()
    }

    /// Commit hash a ref resolves to on the simulated remote.
    pub fn resolve(repo: &RepoId, revision: &Revision) -> Revision {
        if is_commit_hash(revision) {
            return revision.clone();
        }
        let digest = blake3::hash(format!("mock:{repo}@{revision}").as_bytes());
        Revision::new(&digest.to_hex().as_str()[..40])
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn is_commit_hash(revision: &Revision) -> bool {
    revision.len() == 40 && revision.chars().all(|c| c.is_ascii_hexdigit())
}

impl RetrievalBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn retrieve(
        &self,
        repo: &RepoId,
        revision: &Revision,
        include: &[String],
        exclude: &[String],
    ) -> Result<(), HubError> {
        let mut state = self.lock();
        state.calls.push(MockCall::Retrieve {
            repo: repo.clone(),
            revision: revision.clone(),
        });
        if state.fail_retrieve.contains(repo) {
            return Err(HubError::RevisionNotFound {
                repo: repo.to_string(),
                revision: revision.to_string(),
            });
        }

        let filter = FileFilter::new(include, exclude);
        let selected: Vec<String> = state
            .remote_files
            .get(repo)
            .map(|files| {
                filter
                    .select(files.iter().map(String::as_str))
                    .into_iter()
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        state.fetched.insert(repo.clone(), selected);

        let commit = Self::resolve(repo, revision);
        // A named ref points at exactly one revision per repository.
        if !is_commit_hash(revision) {
            for entry in state.cache.iter_mut().filter(|e| &e.repo_id == repo) {
                entry.refs.remove(revision.as_str());
            }
        }
        let pos = match state
            .cache
            .iter()
            .position(|e| &e.repo_id == repo && e.revision == commit)
        {
            Some(pos) => pos,
            None => {
                state.cache.push(CacheEntry {
                    repo_id: repo.clone(),
                    revision: commit,
                    refs: BTreeSet::new(),
                });
                state.cache.len() - 1
            }
        };
        if !is_commit_hash(revision) {
            state.cache[pos].refs.insert(revision.to_string());
        }
        Ok(())
    }

    fn verify(&self, repo: &RepoId, revision: &Revision) -> Result<(), HubError> {
        let mut state = self.lock();
        state.calls.push(MockCall::Verify {
            repo: repo.clone(),
            revision: revision.clone(),
        });
        if state.fail_verify.contains(repo) {
            return Err(HubError::VerificationFailed {
                repo: repo.to_string(),
                revision: revision.to_string(),
                detail: "checksum mismatch".to_owned(),
            });
        }
        let cached = state.cache.iter().any(|e| {
            &e.repo_id == repo
                && (&e.revision == revision || e.refs.contains(revision.as_str()))
        });
        if cached {
            Ok(())
        } else {
            Err(HubError::VerificationFailed {
                repo: repo.to_string(),
                revision: revision.to_string(),
                detail: "revision is not in the local cache".to_owned(),
            })
        }
    }

    fn list_snapshot(&self) -> Result<CacheSnapshot, HubError> {
        let mut state = self.lock();
        state.calls.push(MockCall::ListSnapshot);
        Ok(CacheSnapshot::new(state.cache.clone()))
    }
}
