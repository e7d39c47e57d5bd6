//! Manifest parsing, lock files, cache snapshots, and file filters for facehugger.
//!
//! This crate defines the schema layer: YAML manifest parsing (`Manifest`),
//! lock file reading/writing (`LockFile`), cache listing records
//! (`CacheSnapshot`), the include/exclude predicate (`FileFilter`), and the
//! identifier newtypes shared by every other crate.

pub mod filter;
pub mod lock;
pub mod manifest;
pub mod snapshot;
pub mod types;

pub use filter::FileFilter;
pub use lock::{parse_lock_str, LockEntry, LockError, LockFile};
pub use manifest::{parse_manifest_file, parse_manifest_str, Manifest, ManifestError, ModelEntry};
pub use snapshot::{CacheEntry, CacheSnapshot, RecordError, SnapshotError};
pub use types::{RepoId, Revision, DEFAULT_REVISION};
