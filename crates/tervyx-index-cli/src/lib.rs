// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

use clap::{error::ErrorKind, ArgAction, Parser, Subcommand, ValueEnum};
use tervyx_index_core::{ExitCode, MachineError};
use tervyx_index_ingest::{IndexFormat, IngestError, DEFAULT_PROGRESS_INTERVAL};
use tervyx_index_policies::PolicyError;

use crate::logging::{init_tracing, LogFlags};

#[derive(Parser)]
#[command(name = "tervyx-index")]
#[command(version, about = "TERVYX entry index ingestion and validation")]
#[command(
    after_help = "Environment:\n  TERVYX_LOG_LEVEL   Log filter (falls back to RUST_LOG)\n  TERVYX_LOG_JSON    Emit JSON log lines when set to 1"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one shard of the index from an entries tree.
    Ingest {
        #[arg(long, default_value = "tervyx/entries")]
        root: PathBuf,
        #[arg(long, default_value = "reports/tables/index.jsonl")]
        out: PathBuf,
        #[arg(long, default_value_t = 0)]
        shard_index: usize,
        #[arg(long, default_value_t = 1)]
        shard_count: usize,
        #[arg(long, value_enum)]
        format: Option<FormatCli>,
        #[arg(long, default_value_t = DEFAULT_PROGRESS_INTERVAL)]
        progress_interval: usize,
    },
    /// Concatenate shard indexes into one.
    Merge {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum)]
        format: Option<FormatCli>,
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },
    /// Run the consistency checks over an index.
    Validate {
        #[arg(long = "in", default_value = "reports/tables/index.jsonl")]
        input: PathBuf,
        #[arg(long, default_value = "policy.yaml")]
        policy: PathBuf,
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        fail_on_error: bool,
        #[arg(long, default_value_t = false)]
        strict_policy: bool,
    },
    /// Print the canonical fingerprint of a policy file.
    Fingerprint {
        #[arg(long, default_value = "policy.yaml")]
        policy: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatCli {
    Jsonl,
    Sqlite,
}

impl From<FormatCli> for IndexFormat {
    fn from(value: FormatCli) -> Self {
        match value {
            FormatCli::Jsonl => Self::Jsonl,
            FormatCli::Sqlite => Self::Sqlite,
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct OutputMode {
    pub json: bool,
}

#[derive(Debug)]
pub(crate) struct CliError {
    exit_code: ExitCode,
    machine: MachineError,
}

impl CliError {
    pub(crate) fn new(exit_code: ExitCode, code: &str, message: &str) -> Self {
        Self {
            exit_code,
            machine: MachineError::new(code, message),
        }
    }

    pub(crate) fn internal(message: String) -> Self {
        Self::new(ExitCode::Internal, "internal_error", &message)
    }

    pub(crate) fn dependency(message: String) -> Self {
        Self::new(ExitCode::DependencyFailure, "dependency_failure", &message)
    }

    pub(crate) fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.machine = self.machine.with_detail(key, value);
        self
    }
}

impl From<IngestError> for CliError {
    fn from(err: IngestError) -> Self {
        let message = err.to_string();
        let (exit_code, code) = match &err {
            IngestError::InvalidShard { .. } => (ExitCode::Usage, "invalid_shard"),
            IngestError::NoInputs => (ExitCode::Usage, "no_inputs"),
            IngestError::MissingRoot(_) => (ExitCode::Validation, "missing_root"),
            IngestError::NoEntriesFound(_) => (ExitCode::Validation, "no_entries"),
            IngestError::NoValidRecords { .. } => (ExitCode::Validation, "no_valid_records"),
            IngestError::ColumnMismatch { .. } => (ExitCode::DependencyFailure, "column_mismatch"),
            IngestError::Decode { .. } => (ExitCode::DependencyFailure, "index_decode"),
            IngestError::Io(_) => (ExitCode::DependencyFailure, "io_error"),
            _ => (ExitCode::Internal, "internal_error"),
        };
        Self::new(exit_code, code, &message)
    }
}

impl From<PolicyError> for CliError {
    fn from(err: PolicyError) -> Self {
        Self::new(ExitCode::DependencyFailure, "policy_error", &err.to_string())
    }
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success.code()),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code.code())
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => {
                return Err(
                    CliError::new(ExitCode::Usage, "usage_error", "invalid command line arguments")
                        .with_detail("error", &err.to_string()),
                );
            }
        },
    };
    init_tracing(LogFlags {
        quiet: cli.quiet,
        verbose: cli.verbose,
        json: cli.json,
    });
    let output_mode = OutputMode { json: cli.json };

    match cli.command {
        Commands::Ingest {
            root,
            out,
            shard_index,
            shard_count,
            format,
            progress_interval,
        } => commands::run_ingest(
            commands::IngestArgs {
                root,
                out,
                shard_index,
                shard_count,
                format: format.map(IndexFormat::from),
                progress_interval,
            },
            output_mode,
        ),
        Commands::Merge {
            out,
            format,
            inputs,
        } => commands::run_merge(&inputs, &out, format.map(IndexFormat::from), output_mode),
        Commands::Validate {
            input,
            policy,
            report,
            fail_on_error,
            strict_policy,
        } => commands::run_validate(
            commands::ValidateArgs {
                input,
                policy,
                report,
                fail_on_error,
                strict_policy,
            },
            output_mode,
        ),
        Commands::Fingerprint { policy } => commands::run_fingerprint(&policy, output_mode),
    }
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("error: {}", error.machine.message);
    }
}
