mod output;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use facehugger_core::{
    install_signal_handler, CoreError, Engine, SyncOptions, DEFAULT_MANIFEST_FILE,
};
use facehugger_hub::format_missing;
use output::{EXIT_FAILURE, EXIT_SUCCESS};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "facehugger",
    version,
    about = "Download the Hugging Face models declared in a facehugger.yaml manifest"
)]
struct Cli {
    /// Path to the manifest file.
    #[arg(default_value = DEFAULT_MANIFEST_FILE)]
    manifest: PathBuf,

    /// Print the planned hf commands without downloading or verifying anything.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Require every model to be pinned by the lock file and forbid drift.
    #[arg(long, default_value_t = false)]
    frozen: bool,

    /// Lock file to read (default: facehugger.lock next to the manifest, if present).
    #[arg(long, value_name = "PATH")]
    lock: Option<PathBuf>,

    /// Record the cached revisions in the lock file after a successful run.
    #[arg(long, default_value_t = false, conflicts_with_all = ["frozen", "dry_run"])]
    write_lock: bool,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// Retrieval backend.
    #[arg(long, default_value = "hf", value_parser = ["hf", "mock"], hide = true)]
    backend: String,

    /// Print shell completions for bash, zsh, fish, elvish, or powershell and exit.
    #[arg(long, value_name = "SHELL", exclusive = true)]
    completions: Option<Shell>,
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "facehugger", &mut std::io::stdout());
        return ExitCode::from(EXIT_SUCCESS);
    }

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.json {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("FACEHUGGER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => ExitCode::from(report_error(&err, cli.json)),
    }
}

fn run(cli: &Cli) -> Result<u8, CoreError> {
    let engine = Engine::with_backend(&cli.backend)?;
    let options = SyncOptions {
        frozen: cli.frozen,
        dry_run: cli.dry_run,
        lock_path: cli.lock.clone(),
        write_lock: cli.write_lock,
    };

    let prepared = engine.prepare(&cli.manifest, &options)?;
    if std::env::var("FACEHUGGER_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = engine.backend().missing_prereqs();
        if !missing.is_empty() {
            eprintln!("error: {}", format_missing(&missing));
            return Ok(EXIT_FAILURE);
        }
    }
    if !cli.json {
        output::print_plan(&prepared);
    }

    let report = engine.run(prepared, &options)?;
    if cli.json {
        match output::json_pretty(&report) {
            Ok(doc) => println!("{doc}"),
            Err(msg) => {
                eprintln!("error: {msg}");
                return Ok(EXIT_FAILURE);
            }
        }
    } else {
        output::print_report(&report);
    }
    Ok(EXIT_SUCCESS)
}

fn report_error(err: &CoreError, json: bool) -> u8 {
    eprintln!("error: {err}");
    if let CoreError::Execution(failure) = err {
        output::print_partial(failure);
    }
    if json {
        if let Ok(doc) = output::json_pretty(&output::failure_json(err)) {
            println!("{doc}");
        }
    }
    output::exit_code(err)
}
