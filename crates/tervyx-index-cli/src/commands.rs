// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tervyx_index_core::ExitCode;
use tervyx_index_ingest::{
    ingest_entries, merge_shard_indexes, read_records, IndexFormat, IngestOptions, ShardSpec,
};
use tervyx_index_policies::load_policy_config;
use tervyx_index_validate::{ValidationContext, ValidationReport, Validator};
use tracing::{info, warn};

use crate::{CliError, OutputMode};

pub(crate) struct IngestArgs {
    pub root: PathBuf,
    pub out: PathBuf,
    pub shard_index: usize,
    pub shard_count: usize,
    pub format: Option<IndexFormat>,
    pub progress_interval: usize,
}

pub(crate) struct ValidateArgs {
    pub input: PathBuf,
    pub policy: PathBuf,
    pub report: Option<PathBuf>,
    pub fail_on_error: bool,
    pub strict_policy: bool,
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let text = serde_json::to_string(value).map_err(|e| CliError::internal(e.to_string()))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn run_ingest(args: IngestArgs, output_mode: OutputMode) -> Result<(), CliError> {
    let shard = ShardSpec::new(args.shard_index, args.shard_count)?;
    let opts = IngestOptions {
        format: args
            .format
            .unwrap_or_else(|| IndexFormat::from_path(&args.out)),
        root: args.root,
        output: args.out,
        shard,
        progress_interval: args.progress_interval,
    };
    let result = ingest_entries(&opts)?;
    if output_mode.json {
        print_json(&json!({
            "output": result.output,
            "format": opts.format.as_str(),
            "summary": result.summary,
        }))?;
    } else {
        println!(
            "ingest: wrote {} rows to {} (shard {}/{}, skipped {})",
            result.summary.rows,
            result.output.display(),
            shard.index(),
            shard.count(),
            result.summary.skipped_total()
        );
    }
    Ok(())
}

pub(crate) fn run_merge(
    inputs: &[PathBuf],
    out: &Path,
    format: Option<IndexFormat>,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let format = format.unwrap_or_else(|| IndexFormat::from_path(out));
    let summary = merge_shard_indexes(inputs, out, format)?;
    if output_mode.json {
        print_json(&json!({
            "output": summary.output,
            "format": format.as_str(),
            "inputs": summary.inputs,
            "rows": summary.rows,
        }))?;
    } else {
        println!(
            "merge: wrote {} rows from {} shards to {}",
            summary.rows,
            summary.inputs,
            summary.output.display()
        );
    }
    Ok(())
}

fn validation_context(policy: &Path, strict: bool) -> Result<ValidationContext, CliError> {
    if !policy.exists() {
        warn!(
            policy = %policy.display(),
            "policy file not found; running anchor check without expected values"
        );
        return Ok(ValidationContext::default().with_strict_policy(strict));
    }
    let config = load_policy_config(policy)?;
    let ctx = ValidationContext::from_policy(&config)?.with_strict_policy(strict);
    if let Some(verifier) = &ctx.verifier {
        info!(
            policy = %policy.display(),
            fingerprint = %verifier.expected(),
            "policy loaded"
        );
    }
    Ok(ctx)
}

fn write_report(path: &Path, report: &ValidationReport) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CliError::dependency(e.to_string()))?;
    }
    let bytes =
        serde_json::to_vec_pretty(report).map_err(|e| CliError::internal(e.to_string()))?;
    fs::write(path, bytes).map_err(|e| CliError::dependency(e.to_string()))?;
    info!(report = %path.display(), "validation report written");
    Ok(())
}

pub(crate) fn run_validate(args: ValidateArgs, output_mode: OutputMode) -> Result<(), CliError> {
    let records = read_records(&args.input).map_err(|e| {
        CliError::from(e).with_detail("index", &args.input.display().to_string())
    })?;
    let ctx = validation_context(&args.policy, args.strict_policy)?;
    let report = Validator::new(ctx).run(&records);

    if let Some(path) = &args.report {
        write_report(path, &report)?;
    }
    if output_mode.json {
        let value =
            serde_json::to_value(&report).map_err(|e| CliError::internal(e.to_string()))?;
        print_json(&value)?;
    } else {
        println!(
            "validate: rows={} errors={} warnings={}",
            report.row_count,
            report.error_count(),
            report.warning_count()
        );
        for finding in &report.findings {
            println!(
                "  [{}] {} {}: {}",
                finding.severity.as_str(),
                finding.check.as_str(),
                finding.subject,
                finding.message
            );
        }
    }

    if args.fail_on_error && report.has_errors() {
        return Err(CliError::new(
            ExitCode::Validation,
            "validation_failed",
            &format!("{} error-level findings", report.error_count()),
        ));
    }
    Ok(())
}

pub(crate) fn run_fingerprint(policy: &Path, output_mode: OutputMode) -> Result<(), CliError> {
    let config = load_policy_config(policy)?;
    let fingerprint = config.fingerprint()?;
    if output_mode.json {
        let anchors = config.anchors();
        print_json(&json!({
            "policy": policy,
            "fingerprint": fingerprint.as_str(),
            "tel5_version": anchors.tel5_version,
            "mc_version": anchors.mc_version,
            "journal_snapshot": anchors.journal_snapshot,
        }))?;
    } else {
        println!("{fingerprint}");
    }
    Ok(())
}
