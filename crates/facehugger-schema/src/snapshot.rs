//! Cache listing records as produced by `hf cache ls --revisions --format json`.
//!
//! The same record shape backs both the lock file and cache snapshots: only
//! `repo_id`, `revision`, and `refs` are retained, every other key is dropped.

use crate::types::{RepoId, Revision};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record {index} must be a mapping")]
    NotAMapping { index: usize },
    #[error("record {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },
    #[error("record {index}: '{field}' must be {expected}")]
    InvalidField {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to parse cache listing: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("cache listing must be a list of records")]
    NotASequence,
    #[error("invalid cache listing: {0}")]
    Record(#[from] RecordError),
}

/// A single locally materialized revision of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub repo_id: RepoId,
    pub revision: Revision,
    #[serde(default)]
    pub refs: BTreeSet<String>,
}

impl CacheEntry {
    pub fn new(repo_id: impl Into<RepoId>, revision: impl Into<Revision>, refs: &[&str]) -> Self {
        Self {
            repo_id: repo_id.into(),
            revision: revision.into(),
            refs: refs.iter().map(ToString::to_string).collect(),
        }
    }

    /// Identity used when diffing snapshots.
    pub fn key(&self) -> (&RepoId, &Revision) {
        (&self.repo_id, &self.revision)
    }

    /// One-line rendering used for cache state output.
    pub fn display_line(&self) -> String {
        if self.refs.is_empty() {
            format!("{} {}", self.repo_id, self.revision)
        } else {
            let refs: Vec<&str> = self.refs.iter().map(String::as_str).collect();
            format!("{} {} ({})", self.repo_id, self.revision, refs.join(", "))
        }
    }
}

/// Ordered cache state at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CacheSnapshot {
    pub entries: Vec<CacheEntry>,
}

impl CacheSnapshot {
    pub fn new(entries: Vec<CacheEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CacheEntry> {
        self.entries.iter()
    }

    pub fn contains(&self, repo_id: &RepoId, revision: &Revision) -> bool {
        self.entries
            .iter()
            .any(|e| e.key() == (repo_id, revision))
    }

    /// All cached revisions of one repository, in listing order.
    pub fn for_repo<'a>(&'a self, repo_id: &'a RepoId) -> impl Iterator<Item = &'a CacheEntry> {
        self.entries.iter().filter(move |e| &e.repo_id == repo_id)
    }

    /// Parse `hf cache ls --revisions --format json` output. Empty output is an
    /// empty cache.
    pub fn from_listing(input: &str) -> Result<Self, SnapshotError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_str(input)?;
        let records = match value {
            Value::Null => return Ok(Self::default()),
            Value::Sequence(seq) => seq,
            _ => return Err(SnapshotError::NotASequence),
        };
        let entries = records
            .iter()
            .enumerate()
            .map(|(index, record)| parse_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }
}

impl<'a> IntoIterator for &'a CacheSnapshot {
    type Item = &'a CacheEntry;
    type IntoIter = std::slice::Iter<'a, CacheEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Extract `repo_id`, `revision`, and `refs` from one listing record.
///
/// `refs` may be a list of strings or a single comma separated string, the
/// latter being how the tabular listing prints them.
pub fn parse_record(index: usize, record: &Value) -> Result<CacheEntry, RecordError> {
    let Value::Mapping(map) = record else {
        return Err(RecordError::NotAMapping { index });
    };

    let required_str = |field: &'static str| -> Result<String, RecordError> {
        match map.get(field) {
            None | Some(Value::Null) => Err(RecordError::MissingField { index, field }),
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(_) => Err(RecordError::InvalidField {
                index,
                field,
                expected: "a non-empty string",
            }),
        }
    };

    let repo_id = RepoId::new(required_str("repo_id")?);
    let revision = Revision::new(required_str("revision")?);

    let refs = match map.get("refs") {
        None => return Err(RecordError::MissingField { index, field: "refs" }),
        Some(Value::Null) => BTreeSet::new(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_owned)
            .collect(),
        Some(Value::Sequence(seq)) => seq
            .iter()
            .map(|v| {
                v.as_str().map(str::to_owned).ok_or(RecordError::InvalidField {
                    index,
                    field: "refs",
                    expected: "a list of strings",
                })
            })
            .collect::<Result<BTreeSet<_>, _>>()?,
        Some(_) => {
            return Err(RecordError::InvalidField {
                index,
                field: "refs",
                expected: "a list of strings",
            })
        }
    };

    Ok(CacheEntry {
        repo_id,
        revision,
        refs,
    })
}
