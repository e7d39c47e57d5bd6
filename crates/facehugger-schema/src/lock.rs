use crate::snapshot::{parse_record, CacheEntry, RecordError};
use crate::types::{RepoId, Revision};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("lock file parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("lock file serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("lock file must be a list of records")]
    NotASequence,
    #[error("lock file: {0}")]
    Record(#[from] RecordError),
    #[error("lock file has more than one entry for '{0}'")]
    DuplicateRepo(String),
}

/// Pinned state of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockEntry {
    #[serde(rename = "repo_id")]
    pub repo: RepoId,
    #[serde(rename = "revision")]
    pub resolved_revision: Revision,
    /// Named references (branches, tags) that pointed at `resolved_revision`
    /// when the lock was written.
    pub refs: BTreeSet<String>,
}

impl LockEntry {
    pub fn new(repo: impl Into<RepoId>, revision: impl Into<Revision>, refs: &[&str]) -> Self {
        Self {
            repo: repo.into(),
            resolved_revision: revision.into(),
            refs: refs.iter().map(ToString::to_string).collect(),
        }
    }

    /// Whether the lock attests that `reference` resolves to this revision.
    pub fn attests(&self, reference: &Revision) -> bool {
        self.refs.contains(reference.as_str())
    }
}

impl From<CacheEntry> for LockEntry {
    fn from(entry: CacheEntry) -> Self {
        Self {
            repo: entry.repo_id,
            resolved_revision: entry.revision,
            refs: entry.refs,
        }
    }
}

/// The lock file: at most one entry per repository, in file order.
///
/// Uses the record layout of `hf cache ls --revisions --format json`, so a
/// saved cache listing is a valid lock file. Keys other than `repo_id`,
/// `revision`, and `refs` are accepted and discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockFile {
    entries: Vec<LockEntry>,
    index: HashMap<RepoId, usize>,
}

impl LockFile {
    pub fn from_entries(entries: Vec<LockEntry>) -> Result<Self, LockError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if index.insert(entry.repo.clone(), i).is_some() {
                return Err(LockError::DuplicateRepo(entry.repo.to_string()));
            }
        }
        Ok(Self { entries, index })
    }

    pub fn from_value(value: &Value) -> Result<Self, LockError> {
        let records = match value {
            Value::Null => return Ok(Self::default()),
            Value::Sequence(seq) => seq,
            _ => return Err(LockError::NotASequence),
        };
        let entries = records
            .iter()
            .enumerate()
            .map(|(i, record)| parse_record(i, record).map(LockEntry::from))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_entries(entries)
    }

    pub fn get(&self, repo: &RepoId) -> Option<&LockEntry> {
        self.index.get(repo).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[LockEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String, LockError> {
        let mut out = serde_json::to_string_pretty(&self.entries)?;
        out.push('\n');
        Ok(out)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), LockError> {
        let path = path.as_ref();
        let content = self.to_json()?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LockError::Io(e.error))?;
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let content = fs::read_to_string(path)?;
        parse_lock_str(&content)
    }
}

pub fn parse_lock_str(input: &str) -> Result<LockFile, LockError> {
    if input.trim().is_empty() {
        return Ok(LockFile::default());
    }
    let value: Value = serde_yaml::from_str(input)?;
    LockFile::from_value(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_lock() {
        let input = r#"
- repo_id: org/m1
  revision: abc123
  refs: [v1, main]
- repo_id: org/m2
  revision: def456
  refs: []
"#;
        let lock = parse_lock_str(input).unwrap();
        assert_eq!(lock.len(), 2);
        let m1 = lock.get(&RepoId::new("org/m1")).unwrap();
        assert_eq!(m1.resolved_revision, "abc123");
        assert!(m1.attests(&Revision::new("v1")));
        assert!(!m1.attests(&Revision::new("v2")));
        assert!(lock.get(&RepoId::new("org/m3")).is_none());
    }

    #[test]
    fn parses_cache_listing_json_and_ignores_extra_keys() {
        let input = r#"[{"repo_id": "org/m1", "repo_type": "model", "revision": "abc123",
            "snapshot_path": "/tmp/x", "size_on_disk": 12, "last_accessed": 1.0,
            "last_modified": 2.0, "refs": ["main"], "something_new": true}]"#;
        let lock = parse_lock_str(input).unwrap();
        assert_eq!(
            lock.entries(),
            &[LockEntry::new("org/m1", "abc123", &["main"])]
        );
    }

    #[test]
    fn preserves_file_order() {
        let input = "- {repo_id: z/z, revision: r1, refs: []}\n- {repo_id: a/a, revision: r2, refs: []}\n";
        let lock = parse_lock_str(input).unwrap();
        assert_eq!(lock.entries()[0].repo, "z/z");
        assert_eq!(lock.entries()[1].repo, "a/a");
    }

    #[test]
    fn rejects_duplicate_repo() {
        let input = "- {repo_id: org/m1, revision: r1, refs: [main]}\n- {repo_id: org/m1, revision: r2, refs: [v1]}\n";
        let err = parse_lock_str(input).unwrap_err();
        assert!(matches!(err, LockError::DuplicateRepo(ref r) if r == "org/m1"));
    }

    #[test]
    fn rejects_missing_refs() {
        let err = parse_lock_str("- {repo_id: org/m1, revision: r1}\n").unwrap_err();
        assert!(matches!(
            err,
            LockError::Record(RecordError::MissingField { field: "refs", .. })
        ));
    }

    #[test]
    fn rejects_missing_repo_id() {
        let err = parse_lock_str("- {revision: r1, refs: []}\n").unwrap_err();
        assert!(matches!(
            err,
            LockError::Record(RecordError::MissingField {
                field: "repo_id",
                ..
            })
        ));
    }

    #[test]
    fn rejects_mapping_at_top_level() {
        let err = parse_lock_str("repo_id: org/m1\n").unwrap_err();
        assert!(matches!(err, LockError::NotASequence));
    }

    #[test]
    fn empty_lock_file_has_no_entries() {
        assert!(parse_lock_str("").unwrap().is_empty());
        assert!(parse_lock_str("[]").unwrap().is_empty());
    }

    #[test]
    fn lock_roundtrip() {
        let lock = LockFile::from_entries(vec![
            LockEntry::new("org/m1", "abc123", &["main", "v1"]),
            LockEntry::new("org/m2", "def456", &[]),
        ])
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facehugger.lock");
        lock.write_to_file(&path).unwrap();
        let loaded = LockFile::read_from_file(&path).unwrap();
        assert_eq!(lock, loaded);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"repo_id\": \"org/m1\""));
        assert!(raw.contains("\"revision\": \"abc123\""));
    }
}
