use crate::reconcile::ResolvedEntry;
use facehugger_hub::command::{self, HF_PROGRAM};
use facehugger_schema::{RepoId, Revision};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Retrieve {
        repo: RepoId,
        revision: Revision,
        include: Vec<String>,
        exclude: Vec<String>,
    },
    Verify {
        repo: RepoId,
        revision: Revision,
    },
}

impl Operation {
    pub fn repo(&self) -> &RepoId {
        match self {
            Operation::Retrieve { repo, .. } | Operation::Verify { repo, .. } => repo,
        }
    }

    pub fn revision(&self) -> &Revision {
        match self {
            Operation::Retrieve { revision, .. } | Operation::Verify { revision, .. } => revision,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Retrieve { .. } => "retrieve",
            Operation::Verify { .. } => "verify",
        }
    }

    pub fn hf_args(&self) -> Vec<String> {
        match self {
            Operation::Retrieve {
                repo,
                revision,
                include,
                exclude,
            } => command::download_args(repo, revision, include, exclude),
            Operation::Verify { repo, revision } => command::verify_args(repo, revision),
        }
    }

    /// The `hf` command line that performs this operation.
    pub fn equivalent_command(&self) -> String {
        command::render(HF_PROGRAM, &self.hf_args())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{}", self.verb(), self.repo(), self.revision())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Execute,
    /// Dry-run: reported, never invoked.
    WouldExecute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedOperation {
    #[serde(flatten)]
    pub operation: Operation,
    pub disposition: Disposition,
}

impl PlannedOperation {
    pub fn will_execute(&self) -> bool {
        self.disposition == Disposition::Execute
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Plan {
    pub operations: Vec<PlannedOperation>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedOperation> {
        self.operations.iter()
    }

    /// Operations that will actually reach the backend.
    pub fn executable(&self) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(|p| p.will_execute())
            .map(|p| &p.operation)
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a PlannedOperation;
    type IntoIter = std::slice::Iter<'a, PlannedOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

/// Compile resolved entries into the ordered operation list: one retrieve and
/// one verify per entry, in entry order. A dry run marks retrievals
/// `WouldExecute` and leaves out their verification.
pub fn build_plan(entries: &[ResolvedEntry], dry_run: bool) -> Plan {
    let mut operations = Vec::with_capacity(entries.len() * 2);
    for entry in entries {
        let retrieve = Operation::Retrieve {
            repo: entry.repo.clone(),
            revision: entry.revision.clone(),
            include: entry.include.clone(),
            exclude: entry.exclude.clone(),
        };
        if dry_run {
            operations.push(PlannedOperation {
                operation: retrieve,
                disposition: Disposition::WouldExecute,
            });
            continue;
        }
        operations.push(PlannedOperation {
            operation: retrieve,
            disposition: Disposition::Execute,
        });
        operations.push(PlannedOperation {
            operation: Operation::Verify {
                repo: entry.repo.clone(),
                revision: entry.revision.clone(),
            },
            disposition: Disposition::Execute,
        });
    }
    Plan { operations }
}
