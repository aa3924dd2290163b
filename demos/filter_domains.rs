use cdp_socket::error::CdpResult;
use cdp_socket::protocol::NoParams;
use cdp_socket::{CdpSocket, SocketConfig};
use serde_json::json;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> CdpResult<()> {
    fmt()
        .pretty()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let socket = CdpSocket::connect("127.0.0.1:9222", SocketConfig::default()).await?;

    let network = socket.on_domain("Network");
    let page = socket.on_domain("Page");
    let mut activity = StreamExt::merge(network, page);

    tokio::spawn(async move {
        while let Some(Ok(event)) = activity.next().await {
            info!("📢 Activity: {}", event.method);
        }
    });

    let mut events = socket.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!("📢 Event received: {} {}", event.method, event.params);
        }
    });

    socket.send_command("Network.enable", NoParams {}).await?;
    socket.send_command("Page.enable", NoParams {}).await?;
    socket
        .send_command("Page.navigate", json!({"url": "https://www.rust-lang.org"}))
        .await?;

    tokio::time::sleep(Duration::from_secs(3)).await;
    socket.close().await;
    Ok(())
}
