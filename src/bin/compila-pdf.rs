//! CLI binary for compila-pdf.
//!
//! A thin shim over the library crate that maps CLI flags to a `Session`,
//! runs one submission and prints the presenter's view.

use anyhow::{Context, Result};
use clap::Parser;
use compila_pdf::{
    ClientConfig, ProcessingState, ProgressCallback, Role, Session, SubmissionProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that follows the session's state transitions.
///
/// Nothing is drawn until a submission starts validating, so errors raised
/// before that (unreadable input files) leave no stray spinner behind.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let spinner_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);

        Arc::new(Self { bar })
    }
}

impl SubmissionProgressCallback for CliProgressCallback {
    fn on_submit_start(&self, guias: usize, comprovantes: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Submitting {guias} guias and {comprovantes} comprovantes…"
            ))
        ));
    }

    fn on_state_change(&self, state: &ProcessingState) {
        match state {
            ProcessingState::Validating => {
                self.bar.set_prefix("Validating");
                self.bar.set_message("checking selection");
                self.bar.enable_steady_tick(Duration::from_millis(80));
            }
            ProcessingState::Submitting => {
                self.bar.set_prefix("Uploading");
                self.bar.set_message("building request");
            }
            ProcessingState::AwaitingResult => {
                self.bar.set_prefix("Processing");
                self.bar.set_message("extracting barcodes and matching…");
            }
            _ => {}
        }
    }

    fn on_settled(&self, state: &ProcessingState) {
        self.bar.finish_and_clear();
        if let Some(line) = settled_line(state) {
            eprintln!("{line}");
        }
    }

    fn on_download_complete(&self, saved_to: &Path, bytes: usize) {
        eprintln!(
            "{} saved {}  {}",
            green("✔"),
            bold(&saved_to.display().to_string()),
            dim(&format!("{:.1} KB", bytes as f64 / 1024.0))
        );
    }
}

/// Stderr summary for a settled state. Failures have none: the rendered
/// view's error line is their only output.
fn settled_line(state: &ProcessingState) -> Option<String> {
    state.report().map(|report| {
        format!(
            "{} {} match(es) found",
            green("✔"),
            bold(&report.total_matches.to_string())
        )
    })
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Match guias against comprovantes and print the result
  compila-pdf --guias guias/*.pdf --comprovantes comprovantes/*.pdf

  # Also download the compiled bundle into ./out
  compila-pdf -g guias/*.pdf -c comprovantes/*.pdf --download -o out

  # JSON view for scripting
  compila-pdf -g alice.pdf -c 001.pdf --json

  # Check that the service is up
  compila-pdf --health

NOTES:
  Only files with a .pdf extension are sent; anything else is skipped.
  The download is only offered when at least one pair matched.

ENVIRONMENT VARIABLES:
  COMPILA_BASE_URL         Service root (default: https://compila-pdf.onrender.com/api/barcode)
  COMPILA_OUTPUT_DIR       Where the compiled bundle is saved
  COMPILA_REQUEST_TIMEOUT  /process timeout in seconds
  RUST_LOG                 Override log filter (e.g. compila_pdf=debug)
"#;

/// Pair guias with comprovantes by barcode via the matching service.
#[derive(Parser, Debug)]
#[command(
    name = "compila-pdf",
    version,
    about = "Pair guias with comprovantes by barcode and download the compiled PDFs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Guia PDFs (named after each person).
    #[arg(short, long, num_args = 1.., required_unless_present = "health")]
    guias: Vec<PathBuf>,

    /// Comprovante PDFs (numbered receipts with a barcode).
    #[arg(short, long, num_args = 1.., required_unless_present = "health")]
    comprovantes: Vec<PathBuf>,

    /// Download the compiled bundle when at least one pair matched.
    #[arg(short, long)]
    download: bool,

    /// Directory the compiled bundle is saved into.
    #[arg(short, long, env = "COMPILA_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Service root URL.
    #[arg(long, env = "COMPILA_BASE_URL", default_value = compila_pdf::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Timeout for the processing request in seconds.
    #[arg(long, env = "COMPILA_REQUEST_TIMEOUT", default_value_t = 300)]
    request_timeout: u64,

    /// Timeout for downloads and health probes in seconds.
    #[arg(long, env = "COMPILA_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Only probe the service health endpoint.
    #[arg(long)]
    health: bool,

    /// Print the result view as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "COMPILA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "COMPILA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "COMPILA_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.health;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SubmissionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let session = Session::with_reqwest(config, &cli.output_dir);

    // ── Health-only mode ─────────────────────────────────────────────────
    if cli.health {
        let status = session
            .check_health()
            .await
            .context("Health check failed")?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            println!(
                "{} {}{}",
                if status.is_ok() { green("✔") } else { red("✘") },
                status.status,
                status
                    .message
                    .as_deref()
                    .map(|m| format!("  {}", dim(m)))
                    .unwrap_or_default()
            );
        }
        return Ok(if status.is_ok() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    // ── Intake ───────────────────────────────────────────────────────────
    for (role, paths) in [(Role::Guias, &cli.guias), (Role::Comprovantes, &cli.comprovantes)] {
        let set = session
            .select_paths(role, paths.as_slice())
            .await
            .with_context(|| format!("Failed to read {role} files"))?;
        if set.rejected_count() > 0 && !cli.quiet {
            eprintln!(
                "{} skipped {} non-PDF {} file(s)",
                cyan("⚠"),
                set.rejected_count(),
                role
            );
        }
    }

    // ── Submit ───────────────────────────────────────────────────────────
    let settled = session.submit().await.context("Submission rejected")?;

    // ── Download ─────────────────────────────────────────────────────────
    let mut download_failed = false;
    if cli.download {
        if session.download_offered() {
            download_failed = session.download().await.is_err();
        } else if !cli.quiet && settled.is_settled() && settled.failure().is_none() {
            eprintln!("{} no matches, nothing to download", cyan("⚠"));
        }
    }

    // ── Render ───────────────────────────────────────────────────────────
    let view = session.view();
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&view).context("Failed to serialise view")?
        );
    } else if !cli.quiet {
        print!("{view}");
    } else if let Some(msg) = session.error_message() {
        eprintln!("{msg}");
    }

    Ok(if settled.failure().is_some() || download_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(&cli.base_url)
        .request_timeout_secs(cli.request_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
