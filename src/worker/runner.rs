use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;

use crate::error::{FarmhandError, Result};
use crate::protocol::{Completion, Message};
use crate::worker::executor::{self, ExecutionOutcome};

/// Connect to the coordinator and execute assignments one at a time.
///
/// Returns when the coordinator closes the connection (normal end of
/// service) and errs on transport failure or a protocol violation; the
/// process exits either way, because a worker has nothing to do without
/// its coordinator.
pub async fn run(url: &str) -> Result<()> {
    tracing::info!(%url, "Connecting to coordinator");
    let (stream, _response) = connect_async(url).await?;
    tracing::info!("Connected");

    let (mut sink, mut frames) = stream.split();

    // Subprocess completions come back to this loop as events so the
    // socket stays responsive while a command runs.
    let (done_tx, mut done_rx) = mpsc::channel::<(Uuid, ExecutionOutcome)>(1);
    let mut current: Option<Uuid> = None;

    loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok(WsMessage::Binary(data))) => {
                    match Message::decode(&data) {
                        Some(Message::Assignment(assignment)) => {
                            if current.is_some() {
                                // The coordinator never double-assigns under
                                // normal protocol. Refuse the new job and
                                // leave the running one alone.
                                tracing::warn!(job_id = %assignment.id, "Already have assignment!");
                                let refusal = Message::Failed(Completion {
                                    id: assignment.id,
                                    std_out: "Already have assignment!".to_string(),
                                    std_err: String::new(),
                                });
                                sink.send(WsMessage::Binary(refusal.to_bytes())).await?;
                            } else {
                                tracing::info!(job_id = %assignment.id, "New job");
                                current = Some(assignment.id);
                                let done = done_tx.clone();
                                tokio::spawn(async move {
                                    let outcome =
                                        executor::execute(assignment.id, &assignment.command).await;
                                    let _ = done.send((assignment.id, outcome)).await;
                                });
                            }
                        }
                        Some(_) => {
                            tracing::error!("Confusing message from coordinator!");
                            return Err(FarmhandError::ConfusingMessage);
                        }
                        None => {}
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    tracing::info!("Connection closed.");
                    return Ok(());
                }
                Some(Ok(WsMessage::Text(_))) => {
                    tracing::warn!("Text data? We don't handle that!");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            done = done_rx.recv() => {
                let Some((job_id, outcome)) = done else { continue };

                // Clear the assignment before reporting, so a prompt
                // refill finds us idle.
                current = None;

                let completion = Completion {
                    id: job_id,
                    std_out: outcome.std_out,
                    std_err: outcome.std_err,
                };
                let report = if outcome.success {
                    Message::Success(completion)
                } else {
                    Message::Failed(completion)
                };
                sink.send(WsMessage::Binary(report.to_bytes())).await?;
            }
        }
    }
}
