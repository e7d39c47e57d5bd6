//! Reconciliation and planning core for facehugger.
//!
//! This crate ties the schema layer to a retrieval backend: it resolves every
//! manifest entry against the lock file (`reconcile`), compiles the ordered
//! retrieve/verify plan (`build_plan`), runs it (`execute`), and diffs the
//! cache before and after (`CacheDelta`). `Engine::sync` is the single entry
//! point used by the CLI.

pub mod concurrency;
pub mod delta;
pub mod engine;
pub mod execute;
pub mod plan;
pub mod reconcile;

pub use concurrency::{install_signal_handler, shutdown_requested};
pub use delta::CacheDelta;
pub use engine::{
    default_lock_path, Engine, Prepared, SyncOptions, SyncReport,
    DEFAULT_LOCK_FILE, DEFAULT_MANIFEST_FILE,
};
pub use execute::{execute, execute_until, ExecutionFailure};
pub use plan::{build_plan, Disposition, Operation, Plan, PlannedOperation};
pub use reconcile::{reconcile, resolve_entry, ResolutionMode, ResolvedEntry, RevisionSource};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] facehugger_schema::ManifestError),
    #[error("lock error: {0}")]
    Lock(#[from] facehugger_schema::LockError),
    #[error("lock error: lock file not found: {0}")]
    LockFileNotFound(String),
    #[error("'{repo}' has no entry in the lock file; frozen mode requires every model to be locked")]
    MissingLockEntry { repo: String },
    #[error("'{repo}' requests ref '{requested}' but the lock file only attests [{attested}]; frozen mode forbids drift")]
    LockDrift {
        repo: String,
        requested: String,
        attested: String,
    },
    #[error("{operation} of '{repo}' at '{revision}' failed: {source}")]
    Delegate {
        operation: &'static str,
        repo: String,
        revision: String,
        #[source]
        source: facehugger_hub::HubError,
    },
    #[error("cache listing failed: {0}")]
    Snapshot(#[source] facehugger_hub::HubError),
    #[error("backend error: {0}")]
    Backend(#[from] facehugger_hub::HubError),
    #[error("interrupted before {next}; remaining operations were not started")]
    Interrupted { next: String },
    #[error("cannot write lock: '{repo}' at '{revision}' is not in the cache")]
    NotCached { repo: String, revision: String },
    #[error("cannot write lock: '{repo}' is listed more than once and resolves to both '{first}' and '{second}'")]
    ConflictingPins {
        repo: String,
        first: String,
        second: String,
    },
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error(transparent)]
    Execution(Box<ExecutionFailure>),
}

impl From<ExecutionFailure> for CoreError {
    fn from(failure: ExecutionFailure) -> Self {
        CoreError::Execution(Box::new(failure))
    }
}

impl CoreError {
    /// Errors raised while deciding what to do, before any backend call.
    pub fn is_reconciliation(&self) -> bool {
        matches!(
            self,
            CoreError::MissingLockEntry { .. } | CoreError::LockDrift { .. }
        )
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self,
            CoreError::Manifest(_) | CoreError::Lock(_) | CoreError::LockFileNotFound(_)
        )
    }
}
