use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::Command as ProcessCommand;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use stringer::beads;
use stringer::cancel::CancelToken;
use stringer::collector;
use stringer::collectors;
use stringer::config;
use stringer::format::{self, BeadsFormatter, Formatter, JsonFormatter};
use stringer::pipeline::{Pipeline, Reporter};
use stringer::report;
use stringer::scanstate;
use stringer::state;
use stringer_types::{ScanConfig, ScanResult};

#[derive(Parser, Debug)]
#[command(name = "stringer", version)]
#[command(about = "Extract latent-work signals from a repository")]
struct Cli {
    /// Path to the repository to scan
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Directory for stringer state (default: <repo>/.stringer)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Per-collector timeout (e.g. 30s, 500ms)
    #[arg(long, global = true)]
    timeout: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the configured collectors and emit signals.
    Scan {
        /// Output encoder (beads, json, tasks, markdown, sarif, html, html-dir).
        #[arg(long)]
        format: Option<String>,

        /// Write to a file (or, for html-dir, a directory) instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Restrict to specific collectors (repeatable).
        #[arg(long = "collector")]
        collectors: Vec<String>,

        /// Cap the emitted signal list, highest priority first.
        #[arg(long)]
        max_issues: Option<usize>,

        /// Glob pattern excluded from every collector (repeatable).
        #[arg(long = "exclude")]
        excludes: Vec<String>,

        /// Force compact JSON output.
        #[arg(long)]
        compact: bool,

        /// Skip filtering against .beads/issues.jsonl.
        #[arg(long)]
        no_existing_filter: bool,

        /// Skip writing the scan-state snapshot.
        #[arg(long)]
        no_state: bool,
    },
    /// Compare a fresh scan against the stored snapshot.
    Diff {
        /// Restrict to specific collectors (repeatable).
        #[arg(long = "collector")]
        collectors: Vec<String>,
    },
    /// Render report sections from a fresh scan.
    Report {
        /// Emit sections as JSON instead of text.
        #[arg(long)]
        json: bool,

        /// Restrict to specific collectors (repeatable).
        #[arg(long = "collector")]
        collectors: Vec<String>,
    },
    /// List registered collectors.
    Collectors,
    /// List available output formats.
    Formats,
    /// List registered report sections.
    Sections,
    /// Print environment diagnostics.
    Doctor,
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    collectors::install();
    report::install();

    let state_dir = cli
        .state_dir
        .clone()
        .unwrap_or_else(|| cli.repo.join(state::STATE_DIR));

    let mut reporter = CliReporter;

    match cli.cmd {
        Commands::Scan {
            ref format,
            ref output,
            ref collectors,
            max_issues,
            ref excludes,
            compact,
            no_existing_filter,
            no_state,
        } => run_scan(ScanArgs {
            repo: &cli.repo,
            state_dir: &state_dir,
            timeout: cli.timeout.as_deref(),
            format: format.as_deref(),
            output: output.as_deref(),
            collectors,
            max_issues,
            excludes,
            compact,
            no_existing_filter,
            no_state,
            reporter: &mut reporter,
        }),
        Commands::Diff { ref collectors } => run_diff(
            &cli.repo,
            &state_dir,
            cli.timeout.as_deref(),
            collectors,
            &mut reporter,
        ),
        Commands::Report {
            json,
            ref collectors,
        } => run_report(
            &cli.repo,
            cli.timeout.as_deref(),
            collectors,
            json,
            &mut reporter,
        ),
        Commands::Collectors => {
            for name in collector::list() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Formats => {
            for name in format::list() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Sections => {
            for (name, description) in report::list() {
                println!("{name}: {description}");
            }
            Ok(())
        }
        Commands::Doctor => run_doctor(&cli.repo, &state_dir, &mut reporter),
    }
}

fn parse_timeout(timeout: Option<&str>) -> Result<Option<Duration>> {
    match timeout {
        Some(s) => humantime::parse_duration(s)
            .map(Some)
            .with_context(|| format!("invalid duration: {s}")),
        None => Ok(None),
    }
}

/// Assemble the scan configuration: file config first, CLI flags on top.
fn build_scan_config(
    repo: &Path,
    timeout: Option<&str>,
    collectors: &[String],
    max_issues: Option<usize>,
    excludes: &[String],
) -> Result<(ScanConfig, config::FileConfig)> {
    let file_config = config::load_config(repo)?;
    let mut scan = file_config.to_scan_config(repo.to_path_buf());

    if !collectors.is_empty() {
        scan.collectors = collectors.to_vec();
    }
    if let Some(max) = max_issues {
        scan.max_issues = max;
    }
    scan.exclude_patterns.extend(excludes.iter().cloned());

    if let Some(timeout) = parse_timeout(timeout)? {
        let names = if scan.collectors.is_empty() {
            collector::list()
        } else {
            scan.collectors.clone()
        };
        for name in names {
            scan.collector_opts.entry(name).or_default().timeout = Some(timeout);
        }
    }

    Ok((scan, file_config))
}

/// Run the pipeline. A fail-mode collector failure still yields the
/// partial result; the caller finishes its output and then fails.
fn execute(pipeline: &Pipeline, reporter: &mut dyn Reporter) -> (ScanResult, bool) {
    match pipeline.run(&CancelToken::new(), reporter) {
        Ok(result) => (result, false),
        Err(failure) => {
            reporter.error(&failure.to_string());
            (*failure.partial, true)
        }
    }
}

struct ScanArgs<'a> {
    repo: &'a Path,
    state_dir: &'a Path,
    timeout: Option<&'a str>,
    format: Option<&'a str>,
    output: Option<&'a Path>,
    collectors: &'a [String],
    max_issues: Option<usize>,
    excludes: &'a [String],
    compact: bool,
    no_existing_filter: bool,
    no_state: bool,
    reporter: &'a mut dyn Reporter,
}

fn run_scan(args: ScanArgs<'_>) -> Result<()> {
    let (scan_config, file_config) = build_scan_config(
        args.repo,
        args.timeout,
        args.collectors,
        args.max_issues,
        args.excludes,
    )?;
    let format_name = args
        .format
        .map(str::to_string)
        .unwrap_or_else(|| file_config.output.format.clone());

    let pipeline = Pipeline::new(scan_config)?;
    let (mut result, failed) = execute(&pipeline, args.reporter);

    if !args.no_existing_filter {
        let beads_path = beads::beads_path(args.repo);
        let existing = beads::load_beads(&beads_path)?;
        if !existing.is_empty() {
            let before = result.signals.len();
            result.signals = beads::filter_existing(std::mem::take(&mut result.signals), &existing);
            let dropped = before - result.signals.len();
            if dropped > 0 {
                args.reporter
                    .info(&format!("{dropped} signal(s) already tracked in {}", beads_path.display()));
            }
        }
    }

    emit(
        &format_name,
        &file_config,
        args.compact,
        &result,
        args.output,
    )?;

    if !args.no_state {
        let new_state =
            scanstate::build_state(args.repo, &pipeline.collector_names(), &result.signals);
        if let Some(prior) = state::load_state(args.state_dir)? {
            let diff = scanstate::diff_states(&prior, &new_state, args.repo);
            if !diff.is_empty() {
                let mut buf = Vec::new();
                scanstate::format_diff(&diff, &mut buf).context("format diff")?;
                for line in String::from_utf8_lossy(&buf).lines() {
                    args.reporter.info(line);
                }
            }
        }
        state::save_state(args.state_dir, &new_state)?;
    }

    if failed {
        bail!("scan failed; partial results were emitted");
    }
    Ok(())
}

/// Pick the encoder and write the signals to stdout or a file.
fn emit(
    format_name: &str,
    file_config: &config::FileConfig,
    compact: bool,
    result: &ScanResult,
    output: Option<&Path>,
) -> Result<()> {
    // html-dir emits into a directory and needs an output path.
    if format_name == "html-dir" {
        let Some(dir) = output else {
            bail!("format \"html-dir\" requires --output <dir>");
        };
        let formatter = format::get_formatter(format_name)?;
        return formatter.format_dir(&result.signals, dir);
    }

    // The beads and json encoders take per-invocation settings; the rest
    // come straight from the registry.
    let formatter: Arc<dyn Formatter> = match format_name {
        "beads" => Arc::new(BeadsFormatter {
            convention: file_config.label_convention(),
        }),
        "json" => {
            let compact = compact || (output.is_none() && !io::stdout().is_terminal());
            Arc::new(JsonFormatter { compact })
        }
        other => format::get_formatter(other)?,
    };

    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?;
            formatter.format(&result.signals, &mut file)?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            formatter.format(&result.signals, &mut lock)?;
        }
    }
    Ok(())
}

fn run_diff(
    repo: &Path,
    state_dir: &Path,
    timeout: Option<&str>,
    collectors: &[String],
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let Some(prior) = state::load_state(state_dir)? else {
        bail!(
            "no prior scan state in {}; run `stringer scan` first",
            state_dir.display()
        );
    };

    let (scan_config, _) = build_scan_config(repo, timeout, collectors, None, &[])?;
    let pipeline = Pipeline::new(scan_config)?;
    let (result, failed) = execute(&pipeline, reporter);

    let current = scanstate::build_state(repo, &pipeline.collector_names(), &result.signals);
    let diff = scanstate::diff_states(&prior, &current, repo);

    let stdout = io::stdout();
    let mut lock = stdout.lock();
    scanstate::format_diff(&diff, &mut lock).context("write diff")?;

    if failed {
        bail!("scan failed during diff");
    }
    Ok(())
}

fn run_report(
    repo: &Path,
    timeout: Option<&str>,
    collectors: &[String],
    json: bool,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let (scan_config, _) = build_scan_config(repo, timeout, collectors, None, &[])?;
    let pipeline = Pipeline::new(scan_config)?;
    let (result, failed) = execute(&pipeline, reporter);

    let mut sections = report::sections();
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    if json {
        let reports = report::render_json(&mut sections, &result)?;
        serde_json::to_writer_pretty(&mut lock, &reports).context("write section JSON")?;
        writeln!(lock).context("write trailing newline")?;
    } else {
        report::render_text(&mut sections, &result, &mut lock)?;
    }

    if failed {
        bail!("scan failed during report");
    }
    Ok(())
}

fn run_doctor(repo: &Path, state_dir: &Path, reporter: &mut dyn Reporter) -> Result<()> {
    println!("repo: {}", repo.display());
    println!("state_dir: {}", state_dir.display());
    println!(
        "state_file: {}",
        if state::state_path(state_dir).exists() {
            "present"
        } else {
            "absent"
        }
    );
    println!(
        "beads_file: {}",
        if beads::beads_path(repo).exists() {
            "present"
        } else {
            "absent"
        }
    );
    println!("collectors: {}", collector::list().join(", "));
    println!("formats: {}", format::list().join(", "));
    println!();

    print_cmd_version("git", reporter);
    Ok(())
}

fn print_cmd_version(cmd: &str, reporter: &mut dyn Reporter) {
    let out = ProcessCommand::new(cmd).arg("--version").output();
    match out {
        Ok(o) if o.status.success() => {
            let version = String::from_utf8_lossy(&o.stdout).trim().to_string();
            println!("{cmd}: {version}");
        }
        Ok(o) => {
            reporter.warn(&format!(
                "{cmd} --version failed: {}",
                String::from_utf8_lossy(&o.stderr).trim()
            ));
        }
        Err(e) => {
            reporter.warn(&format!("unable to run {cmd} --version: {e}"));
        }
    }
}
