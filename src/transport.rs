//! Message transport seam. The socket only needs to read and write whole text
//! frames on an already established connection.

use crate::error::{CdpError, CdpResult};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, trace};

/// Read half of a connection. `None` means the peer closed it.
#[async_trait]
pub trait TransportReader: Send + 'static {
    async fn read_message(&mut self) -> Option<CdpResult<String>>;
}

/// Write half of a connection.
#[async_trait]
pub trait TransportWriter: Send + 'static {
    async fn write_message(&mut self, frame: String) -> CdpResult<()>;

    async fn close(&mut self) -> CdpResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<S> TransportReader for SplitStream<WebSocketStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn read_message(&mut self) -> Option<CdpResult<String>> {
        while let Some(result) = self.next().await {
            let msg = match result {
                Ok(msg) => msg,
                Err(e) => return Some(Err(CdpError::from(e))),
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.as_str().to_owned())),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => debug!("Skipping non UTF-8 binary frame ({} bytes)", bytes.len()),
                },
                Message::Close(frame) => {
                    debug!("WebSocket close frame received: {:?}", frame);
                    return None;
                }
                other => trace!("Skipping control frame: {:?}", other),
            }
        }
        None
    }
}

#[async_trait]
impl<S> TransportWriter for SplitSink<WebSocketStream<S>, Message>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn write_message(&mut self, frame: String) -> CdpResult<()> {
        self.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> CdpResult<()> {
        SinkExt::close(self).await?;
        Ok(())
    }
}

/// Channel-backed transport, for tests and for embedding the socket behind a
/// connection the caller drives itself.
pub mod memory {
    use super::{TransportReader, TransportWriter};
    use crate::error::{CdpError, CdpResult};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    pub struct MemoryReader {
        inbound: mpsc::UnboundedReceiver<CdpResult<String>>,
    }

    pub struct MemoryWriter {
        outbound: mpsc::UnboundedSender<String>,
    }

    /// The far side of a memory transport. Dropping `inbound` closes the
    /// connection for the reader; dropping `outbound` makes writes fail.
    pub struct RemoteEnd {
        pub inbound: mpsc::UnboundedSender<CdpResult<String>>,
        pub outbound: mpsc::UnboundedReceiver<String>,
    }

    impl RemoteEnd {
        /// Delivers one frame to the reader. Returns false once it is gone.
        pub fn push(&self, frame: impl Into<String>) -> bool {
            self.inbound.send(Ok(frame.into())).is_ok()
        }

        /// Makes the reader fail with `err`.
        pub fn fail(&self, err: CdpError) -> bool {
            self.inbound.send(Err(err)).is_ok()
        }

        /// Next frame written by the socket, parsed as JSON.
        pub async fn next_command(&mut self) -> Option<serde_json::Value> {
            let text = self.outbound.recv().await?;
            serde_json::from_str(&text).ok()
        }
    }

    pub fn pair() -> (MemoryReader, MemoryWriter, RemoteEnd) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        (
            MemoryReader {
                inbound: inbound_rx,
            },
            MemoryWriter {
                outbound: outbound_tx,
            },
            RemoteEnd {
                inbound: inbound_tx,
                outbound: outbound_rx,
            },
        )
    }

    #[async_trait]
    impl TransportReader for MemoryReader {
        async fn read_message(&mut self) -> Option<CdpResult<String>> {
            self.inbound.recv().await
        }
    }

    #[async_trait]
    impl TransportWriter for MemoryWriter {
        async fn write_message(&mut self, frame: String) -> CdpResult<()> {
            self.outbound
                .send(frame)
                .map_err(|_| CdpError::disconnected("remote end stopped reading"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::pair;
    use super::*;

    #[tokio::test]
    async fn test_memory_transport_round_trip() {
        let (mut reader, mut writer, mut remote) = pair();

        writer
            .write_message(r#"{"id":1,"method":"Foo.bar"}"#.to_string())
            .await
            .unwrap();
        let sent = remote.next_command().await.unwrap();
        assert_eq!(sent["method"], "Foo.bar");

        assert!(remote.push(r#"{"id":1,"result":{}}"#));
        let frame = reader.read_message().await.unwrap().unwrap();
        assert_eq!(frame, r#"{"id":1,"result":{}}"#);

        drop(remote);
        assert!(reader.read_message().await.is_none());
        assert!(matches!(
            writer.write_message("{}".to_string()).await,
            Err(CdpError::Disconnected { .. })
        ));
    }
}
