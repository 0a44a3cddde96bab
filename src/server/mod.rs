//! Coordinator process: accepts worker connections, owns the job store,
//! and drives dispatch.
//!
//! All state lives in one event-loop task ([`Coordinator`]); sockets,
//! stdin, and remote-launch subprocesses run in auxiliary tasks that only
//! communicate through channels.
//!
//! # Components
//!
//! - [`Coordinator`]: the event loop and the two-phase dispatcher
//! - [`session::WorkerSession`]: per-connection assignment state
//! - [`console`]: operator command parsing and execution
//! - [`launcher`]: ssh bootstrap of workers on remote hosts
//!
//! # Dispatch Flow
//!
//! 1. Ingest (`-t`, console `add`, `restore`) queues jobs and signals
//!    work-available
//! 2. Idle sessions answer with want-work
//! 3. Each answer pops the FIFO queue head and sends an assignment
//! 4. The worker's `success`/`failed` report frees the session, which
//!    asks for more work

pub mod console;
pub mod coordinator;
pub mod launcher;
pub mod session;

pub use coordinator::{Coordinator, CoordinatorHandle, Event, StatusReport, WorkerInfo};
