use std::fmt;
use std::process::{Command, Stdio};

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_runs(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check that the `hf` executable can be started.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_hf_prereqs(program: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !command_runs(program, &["version"]) {
        missing.push(MissingPrereq {
            name: program.to_owned(),
            purpose: "downloading and verifying model repositories",
            install_hint: "pip install -U 'huggingface_hub[cli]' | uv tool install 'huggingface_hub[cli]'",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nfacehugger drives the Hugging Face CLI to fetch models; set FACEHUGGER_HF_BIN to use a specific executable.");
    msg
}
