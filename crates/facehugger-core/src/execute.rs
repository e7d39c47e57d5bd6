use crate::plan::{Operation, Plan};
use crate::CoreError;
use facehugger_hub::RetrievalBackend;
use thiserror::Error;
use tracing::{debug, info};

/// A run that stopped part way. `completed` lists the operations that
/// succeeded before `error`; they are not undone.
#[derive(Debug, Error)]
#[error("{error} ({} of {planned} operations completed)", .completed.len())]
pub struct ExecutionFailure {
    pub completed: Vec<Operation>,
    pub planned: usize,
    #[source]
    pub error: CoreError,
}

pub fn execute(
    plan: &Plan,
    backend: &dyn RetrievalBackend,
) -> Result<Vec<Operation>, ExecutionFailure> {
    execute_until(plan, backend, || false)
}

/// Invoke the plan's executable operations in order, stopping at the first
/// failure or as soon as `should_stop` reports true between operations.
pub fn execute_until(
    plan: &Plan,
    backend: &dyn RetrievalBackend,
    should_stop: impl Fn() -> bool,
) -> Result<Vec<Operation>, ExecutionFailure> {
    let planned = plan.executable().count();
    let mut completed = Vec::with_capacity(planned);

    for op in plan.executable() {
        if should_stop() {
            return Err(ExecutionFailure {
                completed,
                planned,
                error: CoreError::Interrupted {
                    next: op.to_string(),
                },
            });
        }

        info!("{op}");
        info!("equivalent command: {}", op.equivalent_command());
        if let Err(error) = run_operation(op, backend) {
            return Err(ExecutionFailure {
                completed,
                planned,
                error,
            });
        }
        debug!("{op} done via {}", backend.name());
        completed.push(op.clone());
    }

    Ok(completed)
}

fn run_operation(op: &Operation, backend: &dyn RetrievalBackend) -> Result<(), CoreError> {
    let result = match op {
        Operation::Retrieve {
            repo,
            revision,
            include,
            exclude,
        } => backend.retrieve(repo, revision, include, exclude),
        Operation::Verify { repo, revision } => backend.verify(repo, revision),
    };
    result.map_err(|source| CoreError::Delegate {
        operation: op.verb(),
        repo: op.repo().to_string(),
        revision: op.revision().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::build_plan;
    use crate::reconcile::{reconcile, ResolutionMode};
    use facehugger_hub::{MockBackend, MockCall};
    use facehugger_schema::{Manifest, ModelEntry, RepoId, Revision};
    use std::cell::Cell;

    fn plan_for(repos: &[&str], dry_run: bool) -> Plan {
        let manifest = Manifest {
            models: repos.iter().map(|r| ModelEntry::new(*r)).collect(),
        };
        let resolved = reconcile(&manifest, None, ResolutionMode::Unfrozen).unwrap();
        build_plan(&resolved, dry_run)
    }

    fn retrieve_call(repo: &str) -> MockCall {
        MockCall::Retrieve {
            repo: RepoId::new(repo),
            revision: Revision::new("main"),
        }
    }

    fn verify_call(repo: &str) -> MockCall {
        MockCall::Verify {
            repo: RepoId::new(repo),
            revision: Revision::new("main"),
        }
    }

    #[test]
    fn runs_operations_in_plan_order() {
        let backend = MockBackend::new();
        let plan = plan_for(&["org/a", "org/b"], false);
        let done = execute(&plan, &backend).unwrap();
        assert_eq!(done.len(), 4);
        assert_eq!(
            backend.calls(),
            vec![
                retrieve_call("org/a"),
                verify_call("org/a"),
                retrieve_call("org/b"),
                verify_call("org/b"),
            ]
        );
    }

    #[test]
    fn dry_run_invokes_nothing() {
        let backend = MockBackend::new();
        let plan = plan_for(&["org/a", "org/b"], true);
        let done = execute(&plan, &backend).unwrap();
        assert!(done.is_empty());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn failure_aborts_and_reports_completed() {
        let backend = MockBackend::new().failing_retrieve("org/b");
        let plan = plan_for(&["org/a", "org/b", "org/c"], false);
        let failure = execute(&plan, &backend).unwrap_err();

        assert_eq!(failure.completed.len(), 2);
        assert_eq!(failure.planned, 6);
        match &failure.error {
            CoreError::Delegate {
                operation,
                repo,
                revision,
                ..
            } => {
                assert_eq!(*operation, "retrieve");
                assert_eq!(repo, "org/b");
                assert_eq!(revision, "main");
            }
            other => panic!("expected delegate error, got {other}"),
        }
        assert!(!backend.calls().contains(&retrieve_call("org/c")));
        assert!(failure.to_string().contains("2 of 6"));
    }

    #[test]
    fn verify_failure_is_attributed() {
        let backend = MockBackend::new().failing_verify("org/a");
        let plan = plan_for(&["org/a"], false);
        let failure = execute(&plan, &backend).unwrap_err();
        assert_eq!(failure.completed.len(), 1);
        assert!(
            matches!(failure.error, CoreError::Delegate { operation: "verify", .. }),
            "{}",
            failure.error
        );
    }

    #[test]
    fn stop_request_halts_between_operations() {
        let backend = MockBackend::new();
        let plan = plan_for(&["org/a", "org/b"], false);
        let checks = Cell::new(0);
        let failure = execute_until(&plan, &backend, || {
            checks.set(checks.get() + 1);
            checks.get() > 2
        })
        .unwrap_err();
        assert_eq!(failure.completed.len(), 2);
        assert!(matches!(
            failure.error,
            CoreError::Interrupted { ref next } if next == "retrieve org/b@main"
        ));
        assert_eq!(backend.calls().len(), 2);
    }
}
