use crate::command::Command;
use crate::config::SocketConfig;
use crate::dispatcher::{Dispatcher, SocketState};
use crate::error::{CdpError, CdpResult};
use crate::event_filter::EventFilter;
use crate::pending::PendingCommands;
use crate::protocol::{Notification, RawPayload};
use crate::registry::{EventRegistry, HandlerId};
use crate::rest_client::get_websocket_url;
use crate::transport::{TransportReader, TransportWriter};
use crate::writer::{run_writer, WriterRequest};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::{debug, trace};

/// Handle to one CDP connection. Cheap to clone; every clone talks to the same
/// dispatcher. Dropping the last clone shuts the connection down.
///
/// Handlers are owned by the dispatcher, so a handler that captures a
/// `CdpSocket` keeps the connection open until [`close`](Self::close) is
/// called. Capture a [`WeakCdpSocket`] instead to send follow-up commands
/// without pinning the connection.
#[derive(Clone)]
pub struct CdpSocket {
    inner: Arc<SocketInner>,
}

/// Non-owning handle from [`CdpSocket::downgrade`].
#[derive(Clone)]
pub struct WeakCdpSocket {
    inner: Weak<SocketInner>,
}

struct SocketInner {
    writer_tx: mpsc::UnboundedSender<WriterRequest>,
    pending: Arc<PendingCommands>,
    registry: Arc<EventRegistry>,
    event_tx: broadcast::Sender<Notification>,
    next_id: AtomicU64,
    config: SocketConfig,
    state_rx: watch::Receiver<SocketState>,
    // Dropped with the last handle, which stops the dispatcher.
    shutdown_tx: watch::Sender<bool>,
}

/// Removes a registered command from the pending table unless disarmed.
/// Covers every way out of `send`, including the caller dropping the future.
struct Deregister<'a> {
    pending: &'a PendingCommands,
    id: u64,
    armed: bool,
}

impl Deregister<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Deregister<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(Some(command)) = self.pending.take(self.id) {
            debug!(
                "Deregistered command {} ({}) that will not be awaited",
                self.id,
                command.method()
            );
        }
    }
}

impl CdpSocket {
    /// Discovers the first page target on `host` (e.g. `127.0.0.1:9222`) and
    /// connects to it.
    pub async fn connect(host: &str, config: SocketConfig) -> CdpResult<Self> {
        let ws_url = get_websocket_url(host).await?;
        Self::connect_url(&ws_url, config).await
    }

    pub async fn connect_url(ws_url: &str, config: SocketConfig) -> CdpResult<Self> {
        let (ws_stream, _) = timeout(config.connect_timeout, connect_async(ws_url))
            .await
            .map_err(|_| CdpError::ConnectTimeout {
                url: ws_url.to_string(),
                timeout: config.connect_timeout,
            })??;
        debug!("Connected to {}", ws_url);

        let (ws_sink, ws_stream) = ws_stream.split();
        Ok(Self::from_transport(ws_stream, ws_sink, config))
    }

    /// Starts the writer and dispatcher tasks over an already connected
    /// transport. Must be called inside a tokio runtime.
    pub fn from_transport<R, W>(reader: R, writer: W, config: SocketConfig) -> Self
    where
        R: TransportReader,
        W: TransportWriter,
    {
        let pending = Arc::new(PendingCommands::new());
        let registry = Arc::new(EventRegistry::new());
        let (event_tx, _) = broadcast::channel(config.event_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(SocketState::Running);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_writer(writer, writer_rx));

        let dispatcher = Dispatcher::new(
            Arc::clone(&pending),
            Arc::clone(&registry),
            event_tx.clone(),
            writer_tx.clone(),
            state_tx,
        );
        tokio::spawn(dispatcher.run(reader, shutdown_rx));

        Self {
            inner: Arc::new(SocketInner {
                writer_tx,
                pending,
                registry,
                event_tx,
                next_id: AtomicU64::new(1),
                config,
                state_rx,
                shutdown_tx,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakCdpSocket {
        WeakCdpSocket {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Sends `method` with `params` and waits for the raw result. Applies the
    /// configured `command_timeout`, if any.
    pub async fn send_command<P: Serialize>(
        &self,
        method: &str,
        params: P,
    ) -> CdpResult<RawPayload> {
        let command = Command::new(self.next_id(), method, &params)?;
        self.send(command, self.inner.config.command_timeout).await
    }

    pub async fn send_command_with_timeout<P: Serialize>(
        &self,
        method: &str,
        params: P,
        limit: Duration,
    ) -> CdpResult<RawPayload> {
        let command = Command::new(self.next_id(), method, &params)?;
        self.send(command, Some(limit)).await
    }

    /// Like [`send_command`](Self::send_command), decoding the result into `R`.
    pub async fn send_command_as<P, R>(&self, method: &str, params: P) -> CdpResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.send_command(method, params).await?.decode()
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn send(&self, command: Command, limit: Option<Duration>) -> CdpResult<RawPayload> {
        let inner = &*self.inner;
        if inner.pending.is_closed() {
            return Err(CdpError::disconnected("socket is closed"));
        }

        let id = command.id();
        let text = command.encode()?;
        let (entry, completion) = command.completion();

        inner.pending.insert(id, entry)?;
        let mut registered = Deregister {
            pending: &inner.pending,
            id,
            armed: true,
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if inner
            .writer_tx
            .send(WriterRequest::Frame { text, ack: ack_tx })
            .is_err()
        {
            return Err(CdpError::disconnected("writer task has stopped"));
        }

        match ack_rx.await {
            Ok(result) => result?,
            Err(_) => return Err(CdpError::disconnected("writer task has stopped")),
        }
        trace!("Command {} ({}) written", id, command.method());

        let outcome = match limit {
            None => completion.wait().await,
            Some(limit) => timeout(limit, completion.wait())
                .await
                .map_err(|_| CdpError::Timeout {
                    method: command.method().to_string(),
                    timeout: limit,
                })?,
        };
        registered.disarm();
        outcome
    }

    /// Calls `callback` with the raw params of every `event_name` notification,
    /// after the handlers registered before it.
    pub fn register_handler<F>(&self, event_name: &str, callback: F) -> HandlerId
    where
        F: Fn(&RawPayload) -> CdpResult<()> + Send + Sync + 'static,
    {
        self.inner.registry.register(event_name, Arc::new(callback))
    }

    /// Typed variant of [`register_handler`](Self::register_handler). Params
    /// that fail to decode into `T` are logged and the callback is skipped.
    pub fn on_event<T, F>(&self, event_name: &str, callback: F) -> HandlerId
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.register_handler(event_name, move |params| {
            callback(params.decode::<T>()?);
            Ok(())
        })
    }

    pub fn remove_handler(&self, id: HandlerId) -> bool {
        self.inner.registry.remove(id)
    }

    pub fn handler_count(&self, event_name: &str) -> usize {
        self.inner.registry.handler_count(event_name)
    }

    /// Every notification, as a broadcast stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.event_tx.subscribe()
    }

    pub fn on_domain(&self, domain: &str) -> EventFilter {
        EventFilter::new(self.subscribe(), domain)
    }

    pub fn state(&self) -> SocketState {
        *self.inner.state_rx.borrow()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Resolves once the dispatcher has stopped and failed every pending command.
    pub async fn closed(&self) {
        let mut state_rx = self.inner.state_rx.clone();
        let _ = state_rx
            .wait_for(|state| *state == SocketState::Stopped)
            .await;
    }

    /// Stops the connection, failing pending commands and dropping every
    /// registered handler.
    pub async fn close(&self) {
        let _ = self.inner.writer_tx.send(WriterRequest::Close);
        self.inner.shutdown_tx.send_replace(true);
        self.closed().await;
    }
}

impl WeakCdpSocket {
    /// `None` once every [`CdpSocket`] handle has been dropped.
    pub fn upgrade(&self) -> Option<CdpSocket> {
        self.inner.upgrade().map(|inner| CdpSocket { inner })
    }
}
