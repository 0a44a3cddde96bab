use std::net::SocketAddr;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::protocol::{Assignment, Message};

/// Coordinator-side state for one connected worker.
///
/// Holds at most one assignment at a time; while an assignment is
/// present the referenced job is `InWork`. The socket itself lives in
/// two I/O tasks; the session talks to them through the outbound channel
/// and the cancellation token.
#[derive(Debug)]
pub struct WorkerSession {
    worker_id: u64,
    peer: SocketAddr,
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
    assignment: Option<Uuid>,
    started_at: Option<Instant>,
}

impl WorkerSession {
    pub fn new(
        worker_id: u64,
        peer: SocketAddr,
        outbound: mpsc::UnboundedSender<Message>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            worker_id,
            peer,
            outbound,
            cancel,
            assignment: None,
            started_at: None,
        }
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    /// Peer address, or a placeholder once the socket is gone.
    pub fn name(&self) -> String {
        if self.outbound.is_closed() {
            "<zombie>".to_string()
        } else {
            self.peer.to_string()
        }
    }

    pub fn has_assignment(&self) -> bool {
        self.assignment.is_some()
    }

    pub fn assignment_id(&self) -> Option<Uuid> {
        self.assignment
    }

    /// True when the session would answer a work-available signal.
    pub fn wants_work(&self) -> bool {
        self.assignment.is_none()
    }

    /// Bind a job to this worker: record it, stamp the start time, and
    /// put the assignment frame on the wire.
    pub fn assign(&mut self, id: Uuid, command: String) {
        debug_assert!(self.assignment.is_none());

        self.assignment = Some(id);
        self.started_at = Some(Instant::now());

        let message = Message::Assignment(Assignment { id, command });
        if self.outbound.send(message).is_err() {
            // Socket already gone; the close event will fail the job.
            tracing::warn!(worker_id = self.worker_id, "Assignment sent to a closed session");
        }
    }

    /// Clear the assignment if `id` matches it, returning the elapsed
    /// whole seconds since dispatch. `None` means the worker reported a
    /// job this session never held, which callers treat as a protocol
    /// violation.
    pub fn complete(&mut self, id: Uuid) -> Option<u64> {
        if self.assignment != Some(id) {
            return None;
        }

        self.assignment = None;
        let seconds = self
            .started_at
            .take()
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0);
        Some(seconds)
    }

    /// Drop the assignment without an outcome, for the disconnect path.
    pub fn take_assignment(&mut self) -> Option<Uuid> {
        self.started_at = None;
        self.assignment.take()
    }

    /// One console report line: `- <id> <name> : <idle|job-uuid>`.
    pub fn status_string(&self) -> String {
        let state = match self.assignment {
            Some(id) => id.braced().to_string(),
            None => "idle".to_string(),
        };
        format!("- {} {} : {}", self.worker_id, self.name(), state)
    }

    /// Close the connection. The I/O tasks observe the token, shut the
    /// socket, and post the close event back to the main loop.
    pub fn kill(&self) {
        self.cancel.cancel();
    }
}
