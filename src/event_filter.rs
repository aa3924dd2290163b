use crate::error::CdpResult;
use crate::protocol::Notification;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, Stream};
use tracing::debug;

/// Notification stream restricted to one domain (`Network`, `Page`, …).
pub struct EventFilter {
    inner: BroadcastStream<Notification>,
    domain: String,
}

impl EventFilter {
    pub fn new(receiver: broadcast::Receiver<Notification>, domain: &str) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            domain: domain.to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Stream for EventFilter {
    type Item = CdpResult<Notification>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if event.domain() == self.domain && event.method.contains('.') {
                        return Poll::Ready(Some(Ok(event)));
                    }
                }
                Poll::Ready(Some(Err(lagged))) => {
                    // Skip the gap and carry on from the oldest retained event.
                    debug!("{} event stream {}", self.domain, lagged);
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RawPayload;
    use futures_util::StreamExt;

    fn event(method: &str) -> Notification {
        Notification {
            method: method.to_string(),
            params: RawPayload::from_serialize(&serde_json::json!({})).unwrap(),
            session_id: None,
        }
    }

    #[tokio::test]
    async fn test_filter_matches_domain_prefix_only() {
        let (tx, rx) = broadcast::channel(8);
        let mut page = EventFilter::new(rx, "Page");
        assert_eq!(page.domain(), "Page");

        tx.send(event("PageExtra.thing")).unwrap();
        tx.send(event("Page")).unwrap();
        tx.send(event("Network.dataReceived")).unwrap();
        tx.send(event("Page.frameNavigated")).unwrap();
        drop(tx);

        let received = page.next().await.unwrap().unwrap();
        assert_eq!(received.method, "Page.frameNavigated");
        assert!(page.next().await.is_none());
    }
}
