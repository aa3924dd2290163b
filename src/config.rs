use std::time::Duration;

/// Per-socket settings.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Deadline applied to every `send_command`. `None` waits until the command
    /// is answered or the socket is torn down.
    pub command_timeout: Option<Duration>,
    /// Bound on the WebSocket handshake in `connect`/`connect_url`.
    pub connect_timeout: Duration,
    /// Capacity of the notification broadcast channel.
    pub event_buffer: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            command_timeout: None,
            connect_timeout: Duration::from_secs(5),
            event_buffer: 128,
        }
    }
}

impl SocketConfig {
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Broadcast capacity; clamped to at least 1.
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }
}
