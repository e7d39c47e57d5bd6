//! Retrieval backends for facehugger.
//!
//! This crate is the execution layer: the `RetrievalBackend` trait consumed by
//! the planner's executor, the `hf` command line backend that shells out to
//! the Hugging Face CLI, an in-memory mock backend for tests, and the
//! prerequisite check for the `hf` executable.

pub mod backend;
pub mod command;
pub mod hf;
pub mod mock;
pub mod prereq;

pub use backend::{select_backend, RetrievalBackend};
pub use hf::HfCliBackend;
pub use mock::{MockBackend, MockCall};
pub use prereq::{check_hf_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}{}", fmt_detail(.detail))]
    CommandFailed {
        command: String,
        status: String,
        detail: String,
    },
    #[error("cache listing could not be read: {0}")]
    Listing(#[from] facehugger_schema::SnapshotError),
    #[error("revision '{revision}' of '{repo}' not found")]
    RevisionNotFound { repo: String, revision: String },
    #[error("verification of '{repo}' at '{revision}' failed: {detail}")]
    VerificationFailed {
        repo: String,
        revision: String,
        detail: String,
    },
}

fn fmt_detail(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}
