use std::io::ErrorKind;
use std::process::{Command, Stdio};

use crate::error::CommandError;

/// Runs `program args..` to completion and returns its stdout.
pub fn run(program: &str, args: &[&str]) -> Result<String, CommandError> {
    tracing::debug!(program, ?args, "executing command");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| match source.kind() {
            ErrorKind::NotFound => CommandError::NotFound(program.to_string()),
            _ => CommandError::Io {
                program: program.to_string(),
                source,
            },
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Trimmed stdout, or `None` if the probe failed or printed nothing.
pub fn probe(program: &str, args: &[&str]) -> Option<String> {
    match run(program, args) {
        Ok(out) => {
            let trimmed = out.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Err(err) => {
            tracing::debug!(program, %err, "probe failed");
            None
        }
    }
}
