use crate::error::CdpResult;
use crate::transport::TransportWriter;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

pub(crate) enum WriterRequest {
    /// Write one encoded frame and report the outcome on `ack`.
    Frame {
        text: String,
        ack: oneshot::Sender<CdpResult<()>>,
    },
    Close,
}

/// Owns the write half for the lifetime of the connection. Ends on `Close`,
/// which the dispatcher sends on teardown, closing the transport.
pub(crate) async fn run_writer<W: TransportWriter>(
    mut writer: W,
    mut requests: mpsc::UnboundedReceiver<WriterRequest>,
) {
    while let Some(request) = requests.recv().await {
        match request {
            WriterRequest::Frame { text, ack } => {
                debug!("About to send command {}", text);
                let result = writer.write_message(text).await;
                if let Err(e) = &result {
                    error!("Failed to write command frame: {}", e);
                }
                let _ = ack.send(result);
            }
            WriterRequest::Close => break,
        }
    }

    if let Err(e) = writer.close().await {
        debug!("Error while closing transport: {}", e);
    }
    debug!("CDP writer task finished");
}
