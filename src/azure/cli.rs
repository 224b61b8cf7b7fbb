//! Azure CLI command execution.
//!
//! Provides utilities for running Azure CLI commands and parsing their output.

use colored::Colorize;
use serde_json::Value;
use std::error::Error;
use std::process::Command;

/// Largest stdout accepted from one command.
const MAX_OUTPUT_BYTES: usize = 5_000_000;

/// Run a command given as separate arguments and return its stdout.
pub fn run_args(args: &[&str]) -> Result<String, Box<dyn Error>> {
    let cmd = args.join(" ");
    log::debug!("run({cmd})", cmd = cmd.on_blue());

    let (program, rest) = args.split_first().ok_or("Empty command")?;
    let output = Command::new(program).args(rest).output().map_err(|e| {
        log::error!("Command execution failed: {}", e);
        format!("Failed to execute command: {}", e)
    })?;

    if output.status.success() {
        log::debug!("Success cmd: {cmd}");
        log::debug!("Success output.stdout.len(): {}", output.stdout.len());

        if output.stdout.len() > MAX_OUTPUT_BYTES {
            return Err(format!(
                "Response too large: {} bytes for command: {cmd}",
                output.stdout.len()
            )
            .into());
        }
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::trace!(
            "code={code:?}, status={status}\n┎######\nstderr=\n{stderr}\n┖######",
            code = output.status.code(),
            status = output.status,
            stderr = stderr.red()
        );
        log::warn!(
            "{failed} to run {cmd}",
            failed = "failed".on_red(),
            cmd = cmd.on_blue()
        );
        return Err(format!("ERROR running: {stderr}").into());
    }

    let stdout = String::from_utf8(output.stdout).map_err(|e| format!("Invalid UTF-8: {}", e))?;

    Ok(stdout)
}

/// Run an `az` command with `--output json` and parse the result.
///
/// Empty output parses as `null`.
pub fn run_az_json(args: &[&str], subscription_id: Option<&str>) -> Result<Value, Box<dyn Error>> {
    let mut full: Vec<&str> = Vec::with_capacity(args.len() + 5);
    full.push("az");
    full.extend_from_slice(args);
    if let Some(subscription_id) = subscription_id {
        full.extend_from_slice(&["--subscription", subscription_id]);
    }
    full.extend_from_slice(&["--output", "json"]);

    let stdout = run_args(&full)?;
    parse_json_output(&stdout)
}

/// Fail early with a readable error when `az` is missing or not logged in.
pub fn check_az_cli() -> Result<(), Box<dyn Error>> {
    preflight("az")
}

fn preflight(program: &str) -> Result<(), Box<dyn Error>> {
    run_args(&[program, "--version"])
        .map_err(|e| format!("{program} CLI is not installed or not on PATH: {e}"))?;
    run_args(&[program, "account", "show", "--output", "none"])
        .map_err(|e| format!("{program} CLI is not logged in, run '{program} login': {e}"))?;
    Ok(())
}

fn parse_json_output(stdout: &str) -> Result<Value, Box<dyn Error>> {
    if stdout.trim().is_empty() {
        return Ok(Value::Null);
    }
    let mut deserializer = serde_json::Deserializer::from_str(stdout);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        format!("Error parsing az output: path={} error={}", e.path(), e).into()
    })
}
