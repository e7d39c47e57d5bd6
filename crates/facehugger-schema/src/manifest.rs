use crate::types::{RepoId, Revision};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;

const MODELS_KEY: &str = "models";
const ENTRY_FIELDS: [&str; 4] = ["repo", "ref", "include", "exclude"];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("manifest must be a mapping with a top-level 'models' key")]
    NotAMapping,
    #[error("manifest has no 'models' list")]
    MissingModels,
    #[error("unsupported entry kind '{0}': only 'models' is supported")]
    UnsupportedEntryKind(String),
    #[error("'models' must be a list of entries")]
    ModelsNotAList,
    #[error("models[{index}] must be a mapping")]
    EntryNotAMapping { index: usize },
    #[error("models[{index}] has no 'repo'")]
    MissingRepo { index: usize },
    #[error("models[{index}] has invalid repo '{repo}': must be non-empty without whitespace")]
    InvalidRepo { index: usize, repo: String },
    #[error("model '{repo}': unknown field '{field}'")]
    UnknownField { repo: String, field: String },
    #[error("model '{repo}': '{field}' must be {expected}")]
    InvalidField {
        repo: String,
        field: &'static str,
        expected: &'static str,
    },
}

/// One requested model repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    pub repo: RepoId,
    /// Ref given in the manifest. `None` means the default branch is wanted
    /// and the entry may follow whatever the lock file pins.
    pub revision_ref: Option<Revision>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ModelEntry {
    pub fn new(repo: impl Into<RepoId>) -> Self {
        Self {
            repo: repo.into(),
            revision_ref: None,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_ref(mut self, revision: impl Into<Revision>) -> Self {
        self.revision_ref = Some(revision.into());
        self
    }

    #[must_use]
    pub fn with_include(mut self, patterns: &[&str]) -> Self {
        self.include = patterns.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn with_exclude(mut self, patterns: &[&str]) -> Self {
        self.exclude = patterns.iter().map(ToString::to_string).collect();
        self
    }

    /// The ref to request when nothing else decides: explicit ref or `main`.
    pub fn requested_ref(&self) -> Revision {
        self.revision_ref
            .clone()
            .unwrap_or_else(Revision::default_branch)
    }
}

/// Parsed `facehugger.yaml`. Entries keep authoring order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub models: Vec<ModelEntry>,
}

impl Manifest {
    pub fn from_value(value: &Value) -> Result<Self, ManifestError> {
        let root = match value {
            Value::Mapping(map) => map,
            Value::Null => return Err(ManifestError::MissingModels),
            _ => return Err(ManifestError::NotAMapping),
        };

        for key in root.keys() {
            let name = key_name(key);
            if name != MODELS_KEY {
                return Err(ManifestError::UnsupportedEntryKind(name));
            }
        }

        let models = match root.get(MODELS_KEY) {
            None | Some(Value::Null) => return Err(ManifestError::MissingModels),
            Some(Value::Sequence(seq)) => seq,
            Some(_) => return Err(ManifestError::ModelsNotAList),
        };

        let models = models
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_entry(index, entry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { models })
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn parse_entry(index: usize, value: &Value) -> Result<ModelEntry, ManifestError> {
    let Value::Mapping(map) = value else {
        return Err(ManifestError::EntryNotAMapping { index });
    };

    let repo = match map.get("repo") {
        None | Some(Value::Null) => return Err(ManifestError::MissingRepo { index }),
        Some(Value::String(s)) => RepoId::new(s.as_str()),
        Some(other) => {
            return Err(ManifestError::InvalidRepo {
                index,
                repo: scalar_text(other),
            })
        }
    };
    if !repo.is_valid() {
        return Err(ManifestError::InvalidRepo {
            index,
            repo: repo.into_inner(),
        });
    }

    for key in map.keys() {
        let name = key_name(key);
        if !ENTRY_FIELDS.contains(&name.as_str()) {
            return Err(ManifestError::UnknownField {
                repo: repo.into_inner(),
                field: name,
            });
        }
    }

    let revision_ref = match map.get("ref") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if !s.trim().is_empty() => Some(Revision::new(s.as_str())),
        Some(_) => {
            return Err(ManifestError::InvalidField {
                repo: repo.into_inner(),
                field: "ref",
                expected: "a non-empty string",
            })
        }
    };

    let include = patterns(map, "include", &repo)?;
    let exclude = patterns(map, "exclude", &repo)?;

    Ok(ModelEntry {
        repo,
        revision_ref,
        include,
        exclude,
    })
}

/// Accept a single glob string or a list of glob strings.
fn patterns(map: &Mapping, field: &'static str, repo: &RepoId) -> Result<Vec<String>, ManifestError> {
    let invalid = || ManifestError::InvalidField {
        repo: repo.to_string(),
        field,
        expected: "a string or a list of strings",
    };
    match map.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Sequence(seq)) => seq
            .iter()
            .map(|v| v.as_str().map(str::to_owned).ok_or_else(invalid))
            .collect(),
        Some(_) => Err(invalid()),
    }
}

fn key_name(key: &Value) -> String {
    key.as_str().map_or_else(|| scalar_text(key), str::to_owned)
}

fn scalar_text(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().to_owned())
        .unwrap_or_default()
}

pub fn parse_manifest_str(input: &str) -> Result<Manifest, ManifestError> {
    let value: Value = serde_yaml::from_str(input)?;
    Manifest::from_value(&value)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}
