use std::process::Stdio;

use tokio::process::Command;

/// Bootstrap a worker on a remote host over ssh, pointed back at this
/// coordinator. Fire-and-forget: the outcome is reported to the console
/// log and nothing is retried.
pub fn launch(host: String, exe_path: String, port: u16) {
    tokio::spawn(async move {
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        let callback = format!("ws://{}:{}", hostname, port);

        // ssh -f backgrounds after auth; nohup keeps the worker alive
        // once the ssh session ends.
        let remote_command = format!("nohup {} -c {} &", exe_path, callback);

        tracing::info!(%host, command = %remote_command, "Launching remote worker");

        let result = Command::new("/usr/bin/ssh")
            .arg("-o")
            .arg("PasswordAuthentication=no")
            .arg("-f")
            .arg(&host)
            .arg(&remote_command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => {
                let std_out = String::from_utf8_lossy(&output.stdout);
                tracing::info!(%host, std_out = %std_out.trim(), "Worker launched");
            }
            Ok(output) => {
                let std_err = String::from_utf8_lossy(&output.stderr);
                tracing::error!(
                    %host,
                    exit_code = ?output.status.code(),
                    std_err = %std_err.trim(),
                    "Unable to launch remote worker"
                );
            }
            Err(e) => {
                tracing::error!(%host, error = %e, "Unable to launch remote worker, ssh failed");
            }
        }
    });
}
