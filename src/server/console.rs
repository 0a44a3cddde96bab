//! Operator console: single-line commands read from an async input
//! source and applied to the coordinator in its event loop.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::scheduler::snapshot;
use crate::server::coordinator::{Coordinator, Event};
use crate::server::launcher;
use crate::server::session::WorkerSession;

/// Parsed console input. Argument presence is validated at execution so
/// the operator gets a message instead of a silently ignored line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Exit,
    Add { path: Option<PathBuf> },
    Status,
    Clear { target: Option<String> },
    HaltSave { path: Option<PathBuf> },
    Restore { path: Option<PathBuf> },
    WorkerList,
    WorkerAdd { host: Option<String>, exe: Option<String> },
    WorkerDrop { id: Option<String> },
    WorkerUnknown,
    Unknown { word: String },
}

/// Whitespace-split the line and pick a command by its first word.
/// Returns `None` for blank input.
pub fn parse(line: &str) -> Option<ConsoleCommand> {
    let mut parts = line.split_whitespace();
    let word = parts.next()?;

    let command = match word {
        "exit" => ConsoleCommand::Exit,
        "add" => ConsoleCommand::Add {
            path: parts.next().map(PathBuf::from),
        },
        "status" => ConsoleCommand::Status,
        "clear" => ConsoleCommand::Clear {
            target: parts.next().map(str::to_owned),
        },
        "haltsave" => ConsoleCommand::HaltSave {
            path: parts.next().map(PathBuf::from),
        },
        "restore" => ConsoleCommand::Restore {
            path: parts.next().map(PathBuf::from),
        },
        "worker" => match parts.next() {
            Some("list") => ConsoleCommand::WorkerList,
            Some("add") => ConsoleCommand::WorkerAdd {
                host: parts.next().map(str::to_owned),
                exe: parts.next().map(str::to_owned),
            },
            Some("drop") => ConsoleCommand::WorkerDrop {
                id: parts.next().map(str::to_owned),
            },
            _ => ConsoleCommand::WorkerUnknown,
        },
        other => ConsoleCommand::Unknown {
            word: other.to_owned(),
        },
    };

    Some(command)
}

/// Spawn the auxiliary stdin reader. It owns no state; lines are posted
/// to the event loop as they arrive and the task stops on EOF or
/// shutdown.
pub fn attach_stdin(events: mpsc::Sender<Event>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if events.send(Event::Console { line }).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
        }
    });
}

impl Coordinator {
    pub(crate) fn on_console_line(&mut self, line: &str) {
        let Some(command) = parse(line) else {
            return;
        };

        match command {
            ConsoleCommand::Exit => self.c_exit(),
            ConsoleCommand::Add { path } => self.c_add(path),
            ConsoleCommand::Status => self.c_status(),
            ConsoleCommand::Clear { target } => self.c_clear(target),
            ConsoleCommand::HaltSave { path } => self.c_haltsave(path),
            ConsoleCommand::Restore { path } => self.c_restore(path),
            ConsoleCommand::WorkerList => self.c_worker_list(),
            ConsoleCommand::WorkerAdd { host, exe } => self.c_worker_add(host, exe),
            ConsoleCommand::WorkerDrop { id } => self.c_worker_drop(id),
            ConsoleCommand::WorkerUnknown => {
                tracing::info!("Unknown worker subcommand");
            }
            ConsoleCommand::Unknown { word } => {
                tracing::info!(command = %word, "Unknown command");
            }
        }
    }

    fn c_exit(&mut self) {
        tracing::info!("Closing down coordinator...");
        self.shutdown.cancel();
    }

    fn c_add(&mut self, path: Option<PathBuf>) {
        let Some(path) = path else {
            tracing::info!("Need a filename");
            return;
        };

        tracing::info!(path = %path.display(), "Sourcing new jobs");
        match self.store.ingest_file(&path) {
            Ok(_) => self.notify_work_available(),
            Err(e) => tracing::error!(path = %path.display(), error = %e, "Unable to open file"),
        }
    }

    fn c_status(&mut self) {
        tracing::info!("{} jobs in queue", self.store.pending_len());
        if self.store.failed_len() > 0 {
            tracing::info!("{} jobs failed", self.store.failed_len());
        }

        self.print_workers();
    }

    fn print_workers(&self) {
        tracing::info!("Workers:");
        let mut sessions: Vec<&WorkerSession> = self.sessions.values().collect();
        sessions.sort_by_key(|s| s.worker_id());
        for session in sessions {
            tracing::info!("{}", session.status_string());
        }
    }

    fn c_clear(&mut self, target: Option<String>) {
        match target.as_deref() {
            Some("pending") => {
                self.store.clear_pending();
                tracing::info!("Pending queue cleared");
            }
            _ => {
                tracing::info!("Clear what?");
                tracing::info!("- pending");
            }
        }
    }

    fn c_haltsave(&mut self, path: Option<PathBuf>) {
        let Some(path) = path else {
            tracing::info!("Need a filename");
            return;
        };

        if self.store.pending_len() > 0 {
            tracing::info!("Please clear pending jobs and wait for workers to complete.");
            return;
        }
        if self.store.has_in_work() {
            tracing::info!("Please wait for workers to complete.");
            return;
        }

        match snapshot::write_records(&path, &self.store.snapshot_records()) {
            Ok(()) => {
                tracing::info!("State written. You can stop the coordinator when workers are done.")
            }
            Err(e) => tracing::error!(path = %path.display(), error = %e, "Unable to write snapshot"),
        }
    }

    fn c_restore(&mut self, path: Option<PathBuf>) {
        let Some(path) = path else {
            tracing::info!("Need a filename");
            return;
        };

        match snapshot::read_records(&path) {
            Ok(records) => {
                let added = self.store.absorb_restored(records);
                tracing::info!(added, "State loaded...");
                self.notify_work_available();
            }
            Err(e) => tracing::error!(path = %path.display(), error = %e, "Unable to read snapshot"),
        }
    }

    fn c_worker_list(&mut self) {
        self.print_workers();
    }

    fn c_worker_add(&mut self, host: Option<String>, exe: Option<String>) {
        let Some(host) = host else {
            tracing::info!("Need a host");
            return;
        };

        let exe = match exe {
            Some(exe) => exe,
            None => match std::env::current_exe() {
                Ok(path) => path.to_string_lossy().into_owned(),
                Err(e) => {
                    tracing::error!(error = %e, "Unable to determine own executable path");
                    return;
                }
            },
        };

        launcher::launch(host, exe, self.port);
    }

    fn c_worker_drop(&mut self, id: Option<String>) {
        let Some(id) = id else {
            tracing::info!("Need a worker id");
            return;
        };
        let Ok(worker_id) = id.parse::<u64>() else {
            tracing::info!(id = %id, "Confusing worker id");
            return;
        };

        match self.sessions.get(&worker_id) {
            Some(session) => session.kill(),
            None => tracing::info!(worker_id, "No such worker"),
        }
    }
}
