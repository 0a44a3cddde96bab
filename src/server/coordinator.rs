use std::collections::HashMap;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::protocol::{Completion, Message};
use crate::scheduler::{JobStatus, JobStore};
use crate::server::session::WorkerSession;

const EVENT_QUEUE_DEPTH: usize = 64;

/// Everything that can happen to the coordinator, delivered as discrete
/// events to the single event-loop task that owns all state.
pub enum Event {
    Connected {
        stream: Box<WebSocketStream<TcpStream>>,
        peer: SocketAddr,
    },
    Frame {
        worker_id: u64,
        message: Message,
    },
    Closed {
        worker_id: u64,
    },
    Console {
        line: String,
    },
    Inspect {
        reply: oneshot::Sender<StatusReport>,
    },
}

/// Point-in-time view of the job store and session registry, used by the
/// console `status` command and by tests.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub pending: usize,
    pub failed: usize,
    pub done: usize,
    pub workers: Vec<WorkerInfo>,
}

#[derive(Debug, Clone)]
pub struct WorkerInfo {
    pub worker_id: u64,
    pub name: String,
    pub assignment: Option<Uuid>,
}

/// Cloneable handle for feeding events into a running coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    events: mpsc::Sender<Event>,
    shutdown: CancellationToken,
    local_addr: SocketAddr,
}

impl CoordinatorHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn events(&self) -> mpsc::Sender<Event> {
        self.events.clone()
    }

    pub async fn console_line(&self, line: &str) {
        let _ = self
            .events
            .send(Event::Console {
                line: line.to_string(),
            })
            .await;
    }

    pub async fn inspect(&self) -> Option<StatusReport> {
        let (tx, rx) = oneshot::channel();
        self.events.send(Event::Inspect { reply: tx }).await.ok()?;
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// The coordinator: owns the job store and the session registry, and
/// consumes the event stream. No other task touches this state; socket
/// reads and writes happen in per-connection tasks that communicate
/// through channels.
pub struct Coordinator {
    pub(crate) config: CoordinatorConfig,
    pub(crate) store: JobStore,
    pub(crate) sessions: HashMap<u64, WorkerSession>,
    pub(crate) next_worker_id: u64,
    pub(crate) port: u16,
    pub(crate) events: mpsc::Sender<Event>,
    pub(crate) shutdown: CancellationToken,
    rx: mpsc::Receiver<Event>,
}

impl Coordinator {
    /// Bind the listener and start accepting connections. Events queue in
    /// the channel until [`run`](Self::run) starts draining them.
    pub async fn bind(
        config: CoordinatorConfig,
        shutdown: CancellationToken,
    ) -> Result<(Self, CoordinatorHandle)> {
        let listener = match TcpListener::bind(("0.0.0.0", config.port)).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(port = config.port, error = %e, "Unable to listen");
                return Err(e.into());
            }
        };
        let local_addr = listener.local_addr()?;

        let (events, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        spawn_accept_loop(listener, events.clone(), shutdown.clone());

        let coordinator = Self {
            config,
            store: JobStore::new(),
            sessions: HashMap::new(),
            next_worker_id: 0,
            port: local_addr.port(),
            events: events.clone(),
            shutdown: shutdown.clone(),
            rx,
        };
        let handle = CoordinatorHandle {
            events,
            shutdown,
            local_addr,
        };

        Ok((coordinator, handle))
    }

    /// Drive the event loop until shutdown. Handlers never block; file
    /// I/O for ingest and snapshots is synchronous but small.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(port = self.port, "Listening for workers");

        if let Some(path) = self.config.txtfile.take() {
            match self.store.ingest_file(&path) {
                Ok(_) => self.notify_work_available(),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Unable to ingest job file")
                }
            }
        }

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = self.rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                }
            }
        }

        tracing::info!("Coordinator stopped");
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Connected { stream, peer } => self.on_connected(*stream, peer),
            Event::Frame { worker_id, message } => self.on_frame(worker_id, message),
            Event::Closed { worker_id } => self.on_closed(worker_id),
            Event::Console { line } => self.on_console_line(&line),
            Event::Inspect { reply } => {
                let _ = reply.send(self.status_report());
            }
        }
    }

    fn on_connected(&mut self, stream: WebSocketStream<TcpStream>, peer: SocketAddr) {
        let worker_id = self.next_worker_id;
        self.next_worker_id += 1;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = self.shutdown.child_token();
        spawn_session_io(worker_id, stream, outbound_rx, self.events.clone(), cancel.clone());

        tracing::info!(worker_id, peer = %peer, "Worker connected");
        self.sessions
            .insert(worker_id, WorkerSession::new(worker_id, peer, outbound_tx, cancel));

        self.offer_work(worker_id);
    }

    fn on_frame(&mut self, worker_id: u64, message: Message) {
        match message {
            Message::Assignment(_) => {
                // Only workers receive assignments; drop it.
                tracing::error!(worker_id, "Confusing message from worker!");
            }
            Message::Success(completion) => self.on_completion(worker_id, completion, true),
            Message::Failed(completion) => self.on_completion(worker_id, completion, false),
        }
    }

    fn on_completion(&mut self, worker_id: u64, completion: Completion, success: bool) {
        let Some(session) = self.sessions.get_mut(&worker_id) else {
            tracing::warn!(worker_id, "Completion from unknown session");
            return;
        };

        match session.complete(completion.id) {
            Some(seconds) => {
                self.record_outcome(&completion, success, seconds);
                self.offer_work(worker_id);
            }
            None => {
                tracing::error!(
                    worker_id,
                    job_id = %completion.id,
                    "Completion does not match the assignment, dropping worker"
                );
                session.kill();
            }
        }
    }

    fn on_closed(&mut self, worker_id: u64) {
        let Some(mut session) = self.sessions.remove(&worker_id) else {
            return;
        };
        tracing::info!(worker_id, "Worker disconnected");

        if let Some(job_id) = session.take_assignment() {
            // Forward the loss as if the worker itself had reported it.
            let synthesized = Completion {
                id: job_id,
                std_out: "Connection closed".to_string(),
                std_err: String::new(),
            };
            self.record_outcome(&synthesized, false, 0);
        }
    }

    fn record_outcome(&mut self, completion: &Completion, success: bool, seconds: u64) {
        self.store.complete(&completion.id, success);

        if success {
            tracing::info!(job_id = %completion.id, seconds, "Job done");
        } else {
            tracing::info!(job_id = %completion.id, std_out = %completion.std_out, "Job failed");
            if !completion.std_err.is_empty() {
                tracing::debug!(job_id = %completion.id, std_err = %completion.std_err, "Failure detail");
            }
        }
    }

    /// Two-phase dispatch: work-available asks every session whether it
    /// wants work; each want-work answer is paired with the queue head.
    /// Sessions keep the authoritative view of their own idleness.
    pub(crate) fn notify_work_available(&mut self) {
        let wanting: Vec<u64> = self
            .sessions
            .values()
            .filter(|s| s.wants_work())
            .map(|s| s.worker_id())
            .collect();

        for worker_id in wanting {
            self.offer_work(worker_id);
        }
    }

    fn offer_work(&mut self, worker_id: u64) {
        let Some(session) = self.sessions.get_mut(&worker_id) else {
            return;
        };
        if !session.wants_work() {
            return;
        }
        let Some(job_id) = self.store.take_next() else {
            return;
        };
        let Some(command) = self.store.begin_work(&job_id) else {
            return;
        };

        session.assign(job_id, command);
        tracing::info!(worker_id, job_id = %job_id, "Job assigned");
    }

    pub(crate) fn status_report(&self) -> StatusReport {
        let mut workers: Vec<WorkerInfo> = self
            .sessions
            .values()
            .map(|s| WorkerInfo {
                worker_id: s.worker_id(),
                name: s.name(),
                assignment: s.assignment_id(),
            })
            .collect();
        workers.sort_by_key(|w| w.worker_id);

        StatusReport {
            pending: self.store.pending_len(),
            failed: self.store.failed_len(),
            done: self.store.count_with_status(JobStatus::Done),
            workers,
        }
    }
}

fn spawn_accept_loop(
    listener: TcpListener,
    events: mpsc::Sender<Event>,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept failed");
                            continue;
                        }
                    };

                    let events = events.clone();
                    tokio::spawn(async move {
                        match tokio_tungstenite::accept_async(stream).await {
                            Ok(ws) => {
                                let _ = events
                                    .send(Event::Connected { stream: Box::new(ws), peer })
                                    .await;
                            }
                            Err(e) => {
                                tracing::warn!(peer = %peer, error = %e, "WebSocket handshake failed")
                            }
                        }
                    });
                }
            }
        }
    });
}

/// Per-connection socket tasks. The writer drains the session's outbound
/// channel onto the sink; the reader turns frames into events. Both stop
/// when the session's token is cancelled (operator kill or shutdown), and
/// the reader posts the close event so removal happens in the main loop.
fn spawn_session_io(
    worker_id: u64,
    stream: WebSocketStream<TcpStream>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    events: mpsc::Sender<Event>,
    cancel: CancellationToken,
) {
    let (mut sink, mut frames) = stream.split();

    let writer_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_cancel.cancelled() => {
                    let _ = sink.close().await;
                    break;
                }
                message = outbound.recv() => match message {
                    Some(message) => {
                        if sink.send(WsMessage::Binary(message.to_bytes())).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = sink.close().await;
                        break;
                    }
                }
            }
        }
    });

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = events.send(Event::Closed { worker_id }).await;
                    break;
                }
                frame = frames.next() => match frame {
                    Some(Ok(WsMessage::Binary(data))) => {
                        if let Some(message) = Message::decode(&data) {
                            if events.send(Event::Frame { worker_id, message }).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(WsMessage::Text(_))) => {
                        tracing::warn!(worker_id, "Text data? We don't handle that!");
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        let _ = events.send(Event::Closed { worker_id }).await;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(worker_id, error = %e, "Socket error");
                        let _ = events.send(Event::Closed { worker_id }).await;
                        break;
                    }
                }
            }
        }
    });
}
