//! The read loop: sole consumer of inbound frames. Each frame either resolves
//! the pending command carrying its id or is fanned out to the handlers
//! registered for its method name.

use crate::error::CdpError;
use crate::pending::PendingCommands;
use crate::protocol::{decode_frame, Envelope, Notification, Response};
use crate::registry::EventRegistry;
use crate::transport::TransportReader;
use crate::writer::WriterRequest;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Running,
    Stopped,
}

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FrameOutcome {
    Completed(u64),
    Unmatched(u64),
    Dispatched { method: String, handlers: usize },
    Malformed,
}

/// Longest slice of an undecodable frame that is logged at `warn`.
const FRAME_PREVIEW_BYTES: usize = 256;

/// `text` cut to at most `FRAME_PREVIEW_BYTES`, on a char boundary.
fn frame_preview(text: &str) -> &str {
    if text.len() <= FRAME_PREVIEW_BYTES {
        return text;
    }
    let mut end = FRAME_PREVIEW_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub(crate) struct Dispatcher {
    pending: Arc<PendingCommands>,
    registry: Arc<EventRegistry>,
    event_tx: broadcast::Sender<Notification>,
    writer_tx: mpsc::UnboundedSender<WriterRequest>,
    state: watch::Sender<SocketState>,
}

impl Dispatcher {
    pub(crate) fn new(
        pending: Arc<PendingCommands>,
        registry: Arc<EventRegistry>,
        event_tx: broadcast::Sender<Notification>,
        writer_tx: mpsc::UnboundedSender<WriterRequest>,
        state: watch::Sender<SocketState>,
    ) -> Self {
        Self {
            pending,
            registry,
            event_tx,
            writer_tx,
            state,
        }
    }

    /// Reads until the transport closes or fails, or `shutdown` fires (or its
    /// sender is dropped), then tears down.
    pub(crate) async fn run<R: TransportReader>(
        self,
        mut reader: R,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let reason = loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break "socket closed".to_string(),
                frame = reader.read_message() => match frame {
                    Some(Ok(text)) => {
                        self.handle_frame(&text);
                    }
                    Some(Err(e)) => {
                        debug!("CDP Connection lost due to error: {}", e);
                        break e.to_string();
                    }
                    None => {
                        debug!("CDP Connection closed by server/gracefully");
                        break "connection closed by remote".to_string();
                    }
                },
            }
        };

        self.teardown(&reason);
    }

    pub(crate) fn handle_frame(&self, text: &str) -> FrameOutcome {
        match decode_frame(text) {
            Ok(Envelope::Response(response)) => self.complete(response),
            Ok(Envelope::Notification(notification)) => self.dispatch(notification),
            Err(e) => {
                warn!(
                    "Dropping undecodable frame of {} bytes ({}): {}",
                    text.len(),
                    e,
                    frame_preview(text)
                );
                trace!("Undecodable frame: {}", text);
                FrameOutcome::Malformed
            }
        }
    }

    fn complete(&self, response: Response) -> FrameOutcome {
        let id = response.id;
        let command = match self.pending.take(id) {
            Ok(command) => command,
            Err(e) => {
                error!("Could not look up pending command {}: {}", id, e);
                return FrameOutcome::Unmatched(id);
            }
        };

        match command {
            Some(command) => {
                trace!("Received expected id {} ({}) from CDP", id, command.method());
                command.resolve(response.outcome.map_err(CdpError::from));
                FrameOutcome::Completed(id)
            }
            None => {
                debug!("Discarded message with id {} (no listener found)", id);
                FrameOutcome::Unmatched(id)
            }
        }
    }

    fn dispatch(&self, notification: Notification) -> FrameOutcome {
        let handlers = self.registry.handlers_for(&notification.method);
        trace!(
            "CDP Event: {} ({} handlers)",
            notification.method,
            handlers.len()
        );

        for handler in &handlers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                handler.invoke(&notification.params)
            }));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    "Handler {:?} for {} failed: {}",
                    handler.id(),
                    notification.method,
                    e
                ),
                Err(_) => error!(
                    "Handler {:?} for {} panicked",
                    handler.id(),
                    notification.method
                ),
            }
        }

        let outcome = FrameOutcome::Dispatched {
            method: notification.method.clone(),
            handlers: handlers.len(),
        };
        // No stream subscribers is the common case.
        let _ = self.event_tx.send(notification);
        outcome
    }

    /// Enters `Stopped`, fails every command still waiting, stops the writer
    /// and drops the registered handlers.
    pub(crate) fn teardown(&self, reason: &str) {
        let drained = self.pending.drain();
        debug!(
            "Closing {} pending requests due to disconnection: {}",
            drained.len(),
            reason
        );
        for command in drained {
            command.resolve(Err(CdpError::disconnected(reason)));
        }
        // The writer may already be gone after close().
        let _ = self.writer_tx.send(WriterRequest::Close);
        let released = self.registry.clear();
        trace!("Released {} event handlers", released);
        self.state.send_replace(SocketState::Stopped);
    }
}
