use console::Style;
use facehugger_core::{
    CoreError, Disposition, ExecutionFailure, PlannedOperation, Prepared, RevisionSource,
    SyncReport,
};
use facehugger_schema::CacheSnapshot;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INPUT_ERROR: u8 = 2;
pub const EXIT_RECONCILE_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn exit_code(err: &CoreError) -> u8 {
    if err.is_input() || matches!(err, CoreError::InvalidOptions(_)) {
        EXIT_INPUT_ERROR
    } else if err.is_reconciliation() {
        EXIT_RECONCILE_ERROR
    } else {
        EXIT_FAILURE
    }
}

fn source_label(source: RevisionSource) -> &'static str {
    match source {
        RevisionSource::ExplicitRef => "manifest ref",
        RevisionSource::LockedRevision => "locked",
        RevisionSource::DefaultRef => "default branch",
    }
}

fn planned_line(planned: &PlannedOperation) -> String {
    let marker = match planned.disposition {
        Disposition::Execute => "",
        Disposition::WouldExecute => "[dry-run] ",
    };
    format!(
        "{marker}{}\n    $ {}",
        planned.operation,
        planned.operation.equivalent_command()
    )
}

pub fn print_plan(prepared: &Prepared) {
    if prepared.resolved.is_empty() {
        println!("no models defined in {}", prepared.manifest.display());
        return;
    }
    if let Some(lock) = &prepared.lock {
        println!("lock file: {}", lock.display());
    }
    println!("resolved:");
    for entry in &prepared.resolved {
        println!(
            "  {}@{} ({})",
            entry.repo,
            entry.revision,
            source_label(entry.source)
        );
    }
    println!("plan:");
    for planned in &prepared.plan {
        println!("  {}", planned_line(planned));
    }
}

fn print_snapshot(title: &str, snapshot: &CacheSnapshot) {
    println!("{title}:");
    if snapshot.is_empty() {
        println!("  (empty)");
    }
    for entry in snapshot {
        println!("  {}", entry.display_line());
    }
}

pub fn print_report(report: &SyncReport) {
    print_snapshot("initial cache state", &report.before);
    print_snapshot("final cache state", &report.after);

    if report.delta.is_empty() {
        println!("no cache changes");
    } else {
        let added = Style::new().green();
        let removed = Style::new().red();
        println!("cache changes:");
        for entry in &report.delta.added {
            println!("{}", added.apply_to(format!("+ {}", entry.display_line())));
        }
        for entry in &report.delta.removed {
            println!("{}", removed.apply_to(format!("- {}", entry.display_line())));
        }
    }

    if let Some(path) = &report.lock_written {
        println!("lock written to {}", path.display());
    }
}

/// Report the operations that finished before a run stopped.
pub fn print_partial(failure: &ExecutionFailure) {
    if failure.completed.is_empty() {
        eprintln!("no operations completed");
        return;
    }
    eprintln!(
        "completed before failure ({} of {}):",
        failure.completed.len(),
        failure.planned
    );
    for op in &failure.completed {
        eprintln!("  {op}");
    }
}

pub fn failure_json(err: &CoreError) -> serde_json::Value {
    let completed: Vec<String> = match err {
        CoreError::Execution(failure) => {
            failure.completed.iter().map(ToString::to_string).collect()
        }
        _ => Vec::new(),
    };
    serde_json::json!({
        "error": err.to_string(),
        "exit_code": exit_code(err),
        "completed": completed,
    })
}
