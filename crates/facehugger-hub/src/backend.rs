use crate::prereq::MissingPrereq;
use crate::HubError;
use facehugger_schema::{CacheSnapshot, RepoId, Revision};

/// The external retrieval collaborator.
///
/// Implementations perform the actual transfer and cache inspection; the
/// planner only decides which calls to make and in which order. Every call is
/// synchronous and reports failure through `HubError`.
pub trait RetrievalBackend: Send + Sync {
    fn name(&self) -> &str;

    /// External tools this backend needs but cannot start. Empty when the
    /// backend is ready to use.
    fn missing_prereqs(&self) -> Vec<MissingPrereq> {
        Vec::new()
    }

    /// Materialize `revision` of `repo` locally, restricted to files selected
    /// by the include/exclude patterns.
    fn retrieve(
        &self,
        repo: &RepoId,
        revision: &Revision,
        include: &[String],
        exclude: &[String],
    ) -> Result<(), HubError>;

    /// Check cached content of `repo` at `revision` against the remote checksums.
    fn verify(&self, repo: &RepoId, revision: &Revision) -> Result<(), HubError>;

    /// Current cache state.
    fn list_snapshot(&self) -> Result<CacheSnapshot, HubError>;
}

pub fn select_backend(name: &str) -> Result<Box<dyn RetrievalBackend>, HubError> {
    match name {
        "hf" => Ok(Box::new(crate::hf::HfCliBackend::from_env())),
        "mock" => Ok(Box::new(crate::mock::MockBackend::new())),
        other => Err(HubError::BackendUnavailable(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_valid_backends() {
        assert_eq!(select_backend("hf").unwrap().name(), "hf");
        assert_eq!(select_backend("mock").unwrap().name(), "mock");
    }

    #[test]
    fn mock_needs_no_prerequisites() {
        assert!(select_backend("mock").unwrap().missing_prereqs().is_empty());
    }

    #[test]
    fn select_invalid_backend_fails() {
        assert!(matches!(
            select_backend("rsync"),
            Err(HubError::BackendUnavailable(ref n)) if n == "rsync"
        ));
    }
}
