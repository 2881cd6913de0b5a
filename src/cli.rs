use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing_subscriber::EnvFilter;

use crate::{
    config::VerifierConfig,
    normalize::{normalize, render},
    verifier::{Verdict, verify},
};

/// Checks a matching engine's output trace against the commands it was fed
#[derive(Parser)]
#[command(name = "trace_verifier")]
#[command(
    version,
    about = "Verifies that a limit-order matching engine trace obeys price-time priority"
)]
struct Cli {
    /// Log every replayed event
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trace and print the verdict
    Verify {
        /// Command stream the engine was fed
        #[arg(long)]
        commands: PathBuf,

        /// Trace the engine printed
        #[arg(long)]
        trace: PathBuf,

        /// JSON file with a verifier config; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        checks: CheckFlags,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the trace in the order it would be replayed
    Normalize {
        #[arg(long)]
        trace: PathBuf,

        /// Trace lines carry a submitter id after the tag
        #[arg(long)]
        submitter_ids: bool,
    },
}

#[derive(Args, Default)]
struct CheckFlags {
    /// Trace lines carry a submitter id after the tag
    #[arg(long)]
    submitter_ids: bool,

    /// Do not require contiguous execution sequence numbers
    #[arg(long)]
    no_exec_sequence: bool,

    /// Reject events whose input time is after their output time
    #[arg(long)]
    strict_timestamps: bool,

    /// Allow trades away from the resting order's price
    #[arg(long)]
    no_price_check: bool,
}

impl CheckFlags {
    fn apply(&self, config: &mut VerifierConfig) {
        if self.submitter_ids {
            config.submitter_ids = true;
        }
        if self.no_exec_sequence {
            config.check_exec_sequence = false;
        }
        if self.strict_timestamps {
            config.check_timestamps = true;
        }
        if self.no_price_check {
            config.check_trade_price = false;
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // stdout carries the verdict; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads a whole file as lines.
pub fn read_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(text.lines().map(str::to_owned).collect())
}

/// Loads a JSON config, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<VerifierConfig> {
    match path {
        None => Ok(VerifierConfig::default()),
        Some(path) => {
            let text =
                fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            VerifierConfig::from_json(&text)
                .with_context(|| format!("decoding config {}", path.display()))
        }
    }
}

/// Verifies the trace file against the command file.
pub fn verify_files(
    commands: &Path,
    trace: &Path,
    config: &VerifierConfig,
) -> anyhow::Result<Verdict> {
    let commands = read_lines(commands)?;
    let trace = read_lines(trace)?;
    Ok(verify(&commands, &trace, config))
}

fn handle_verify(
    commands: &Path,
    trace: &Path,
    config: Option<&Path>,
    checks: &CheckFlags,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let mut cfg = load_config(config)?;
    checks.apply(&mut cfg);
    let verdict = verify_files(commands, trace, &cfg)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&verdict.to_json())?);
    } else {
        println!("{}", verdict);
    }
    Ok(if verdict.is_pass() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn handle_normalize(trace: &Path, submitter_ids: bool) -> anyhow::Result<ExitCode> {
    let lines = read_lines(trace)?;
    let records = normalize(&lines, submitter_ids)?;
    for line in render(&records) {
        println!("{}", line);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_cli() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let result = match &cli.command {
        Commands::Verify {
            commands,
            trace,
            config,
            checks,
            json,
        } => handle_verify(commands, trace, config.as_deref(), checks, *json),
        Commands::Normalize {
            trace,
            submitter_ids,
        } => handle_normalize(trace, *submitter_ids),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
