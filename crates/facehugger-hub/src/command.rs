//! Argument vectors for the `hf` command line tool.
//!
//! The same vectors are executed by [`crate::hf::HfCliBackend`] and printed
//! as the "equivalent command" for every planned operation.

use facehugger_schema::{RepoId, Revision};

pub const HF_PROGRAM: &str = "hf";

pub fn download_args(
    repo: &RepoId,
    revision: &Revision,
    include: &[String],
    exclude: &[String],
) -> Vec<String> {
    let mut args = vec![
        "download".to_owned(),
        repo.to_string(),
        "--revision".to_owned(),
        revision.to_string(),
    ];
    for pattern in include {
        args.push("--include".to_owned());
        args.push(pattern.clone());
    }
    for pattern in exclude {
        args.push("--exclude".to_owned());
        args.push(pattern.clone());
    }
    args
}

pub fn verify_args(repo: &RepoId, revision: &Revision) -> Vec<String> {
    vec![
        "cache".to_owned(),
        "verify".to_owned(),
        repo.to_string(),
        "--revision".to_owned(),
        revision.to_string(),
    ]
}

pub fn cache_list_args() -> Vec<String> {
    ["cache", "ls", "--revisions", "--format", "json"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Render a command line for display. Any argument with a character outside
/// `[A-Za-z0-9_./@:=-]` is single-quoted so the line can be pasted into a
/// POSIX shell unchanged.
pub fn render(program: &str, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(quote(program));
    parts.extend(args.iter().map(|a| quote(a)));
    parts.join(" ")
}

fn quote(arg: &str) -> String {
    let safe =
        |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '@' | ':' | '=' | '-');
    let needs_quotes = arg.is_empty() || !arg.chars().all(safe);
    if needs_quotes {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoId {
        RepoId::new("owner/model-repo")
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn download_basic() {
        let args = download_args(&repo(), &Revision::new("main"), &[], &[]);
        assert_eq!(
            render(HF_PROGRAM, &args),
            "hf download owner/model-repo --revision main"
        );
    }

    #[test]
    fn download_with_include_and_exclude() {
        let args = download_args(
            &repo(),
            &Revision::new("main"),
            &strings(&["*.gguf"]),
            &strings(&["*.ckpt"]),
        );
        assert_eq!(
            render(HF_PROGRAM, &args),
            "hf download owner/model-repo --revision main --include '*.gguf' --exclude '*.ckpt'"
        );
    }

    #[test]
    fn download_with_pattern_lists() {
        let args = download_args(
            &repo(),
            &Revision::new("v1.0"),
            &strings(&["*.gguf", "*.safetensors"]),
            &strings(&["*.ckpt", "*.bin"]),
        );
        assert_eq!(
            args,
            strings(&[
                "download",
                "owner/model-repo",
                "--revision",
                "v1.0",
                "--include",
                "*.gguf",
                "--include",
                "*.safetensors",
                "--exclude",
                "*.ckpt",
                "--exclude",
                "*.bin",
            ])
        );
    }

    #[test]
    fn verify_command() {
        let args = verify_args(&repo(), &Revision::new("abc123"));
        assert_eq!(
            render(HF_PROGRAM, &args),
            "hf cache verify owner/model-repo --revision abc123"
        );
    }

    #[test]
    fn cache_list_requests_json() {
        assert_eq!(
            render(HF_PROGRAM, &cache_list_args()),
            "hf cache ls --revisions --format json"
        );
    }

    #[test]
    fn quoting_handles_single_quotes() {
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
        assert_eq!(quote("plain"), "plain");
    }

    #[test]
    fn quoting_covers_shell_operators() {
        for arg in ["a;b", "a&b", "a|b", "(a)", "<a>", "{a,b}", "`a`", r"a\b", "ünï"] {
            assert_eq!(quote(arg), format!("'{arg}'"), "{arg}");
        }
        assert_eq!(quote("org/m1@v1.0:x=y-z_w"), "org/m1@v1.0:x=y-z_w");
    }
}
