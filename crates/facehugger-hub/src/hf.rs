use crate::backend::RetrievalBackend;
use crate::command::{self, HF_PROGRAM};
use crate::prereq::{check_hf_prereqs, MissingPrereq};
use crate::HubError;
use facehugger_schema::{CacheSnapshot, RepoId, Revision};
use std::process::{Command, Output, Stdio};
use tracing::{debug, info};

/// Environment variable overriding the `hf` executable.
pub const HF_BIN_ENV: &str = "FACEHUGGER_HF_BIN";

/// Backend that shells out to the Hugging Face `hf` command line tool.
pub struct HfCliBackend {
    program: String,
}

impl Default for HfCliBackend {
    fn default() -> Self {
        Self::new(HF_PROGRAM)
    }
}

impl HfCliBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `$FACEHUGGER_HF_BIN` when set, otherwise `hf` from `PATH`.
    pub fn from_env() -> Self {
        match std::env::var(HF_BIN_ENV) {
            Ok(bin) if !bin.trim().is_empty() => Self::new(bin),
            _ => Self::default(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).stdin(Stdio::null());
        cmd
    }

    /// Run with stdout captured and stderr passed through, so the tool's own
    /// progress bars stay visible.
    fn run(&self, args: &[String]) -> Result<Output, HubError> {
        let rendered = command::render(&self.program, args);
        debug!("running `{rendered}`");
        let output = self
            .command(args)
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| HubError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(HubError::CommandFailed {
                command: rendered,
                status: output.status.to_string(),
                detail: last_line(&output.stdout),
            });
        }
        Ok(output)
    }
}

fn last_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default()
        .trim()
        .to_owned()
}

impl RetrievalBackend for HfCliBackend {
    fn name(&self) -> &'static str {
        "hf"
    }

    fn missing_prereqs(&self) -> Vec<MissingPrereq> {
        check_hf_prereqs(&self.program)
    }

    fn retrieve(
        &self,
        repo: &RepoId,
        revision: &Revision,
        include: &[String],
        exclude: &[String],
    ) -> Result<(), HubError> {
        let args = command::download_args(repo, revision, include, exclude);
        let output = self.run(&args)?;
        let path = last_line(&output.stdout);
        if !path.is_empty() {
            info!("{repo}@{revision} stored at {path}");
        }
        Ok(())
    }

    fn verify(&self, repo: &RepoId, revision: &Revision) -> Result<(), HubError> {
        let args = command::verify_args(repo, revision);
        let output = self.run(&args).map_err(|e| match e {
            HubError::CommandFailed { detail, .. } => HubError::VerificationFailed {
                repo: repo.to_string(),
                revision: revision.to_string(),
                detail,
            },
            other => other,
        })?;
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            if !line.trim().is_empty() {
                info!("{line}");
            }
        }
        Ok(())
    }

    fn list_snapshot(&self) -> Result<CacheSnapshot, HubError> {
        let output = self.run(&command::cache_list_args())?;
        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(CacheSnapshot::from_listing(&listing)?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, MutexGuard};

    // Writing an executable while another test thread forks can make the
    // later exec fail with ETXTBSY; tests that install scripts run one at a time.
    static SCRIPT_LOCK: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        SCRIPT_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Install a stand-in `hf` script that logs its arguments and answers
    /// `cache ls` with a fixed listing.
    fn fake_hf(dir: &Path, exit_code: i32) -> PathBuf {
        let log = dir.join("calls.log");
        let script = dir.join("hf");
        fs::write(
            &script,
            format!(
                r#"#!/bin/sh
echo "$@" >> "{log}"
if [ "$1" = "cache" ] && [ "$2" = "ls" ]; then
  echo '[{{"repo_id": "org/m1", "revision": "abc123", "refs": ["main"], "repo_type": "model"}}]'
  exit 0
fi
if [ {exit_code} -ne 0 ]; then
  echo "boom"
  exit {exit_code}
fi
echo "/cache/models--org--m1/snapshots/abc123"
"#,
                log = log.display()
            ),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn calls(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn retrieve_passes_revision_and_patterns() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let backend = HfCliBackend::new(fake_hf(dir.path(), 0).to_string_lossy());
        backend
            .retrieve(
                &RepoId::new("org/m1"),
                &Revision::new("v1"),
                &["*.gguf".to_owned()],
                &["*.bin".to_owned()],
            )
            .unwrap();
        assert_eq!(
            calls(dir.path()),
            vec!["download org/m1 --revision v1 --include *.gguf --exclude *.bin"]
        );
    }

    #[test]
    fn list_snapshot_parses_tool_output() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let backend = HfCliBackend::new(fake_hf(dir.path(), 0).to_string_lossy());
        let snap = backend.list_snapshot().unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.entries[0].revision, "abc123");
        assert_eq!(calls(dir.path()), vec!["cache ls --revisions --format json"]);
    }

    #[test]
    fn failing_download_reports_command() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let backend = HfCliBackend::new(fake_hf(dir.path(), 3).to_string_lossy());
        let err = backend
            .retrieve(&RepoId::new("org/m1"), &Revision::new("main"), &[], &[])
            .unwrap_err();
        match err {
            HubError::CommandFailed {
                command, detail, ..
            } => {
                assert!(command.contains("download org/m1 --revision main"));
                assert_eq!(detail, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn failing_verify_is_verification_error() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let backend = HfCliBackend::new(fake_hf(dir.path(), 1).to_string_lossy());
        let err = backend
            .verify(&RepoId::new("org/m1"), &Revision::new("abc123"))
            .unwrap_err();
        assert!(matches!(err, HubError::VerificationFailed { ref repo, .. } if repo == "org/m1"));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let _guard = serial();
        let backend = HfCliBackend::new("/nonexistent/facehugger-test/hf");
        let missing = backend.missing_prereqs();
        assert_eq!(missing[0].name, "/nonexistent/facehugger-test/hf");
        assert!(matches!(
            backend.list_snapshot(),
            Err(HubError::Spawn { .. })
        ));
    }
}
