use std::process::Stdio;

use tokio::process::Command;
use uuid::Uuid;

/// What a finished subprocess looked like. `success` means exit code
/// zero after a normal termination; a signal death or spawn failure is a
/// failure.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub std_out: String,
    pub std_err: String,
}

/// Run one command under the shell and capture its output. The command
/// string is passed verbatim as the single `-c` argument; the operator
/// is expected to embed absolute paths and environment setup in it.
pub async fn execute(job_id: Uuid, command: &str) -> ExecutionOutcome {
    tracing::info!(job_id = %job_id, command, "Launching /bin/sh");

    let result = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(output) => {
            let outcome = ExecutionOutcome {
                success: output.status.success(),
                std_out: String::from_utf8_lossy(&output.stdout).to_string(),
                std_err: String::from_utf8_lossy(&output.stderr).to_string(),
            };
            tracing::info!(
                job_id = %job_id,
                exit_code = ?output.status.code(),
                success = outcome.success,
                "Command finished"
            );
            outcome
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Unable to spawn shell");
            ExecutionOutcome {
                success: false,
                std_out: String::new(),
                std_err: e.to_string(),
            }
        }
    }
}
