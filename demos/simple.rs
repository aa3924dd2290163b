use cdp_socket::error::CdpResult;
use cdp_socket::protocol::NoParams;
use cdp_socket::{CdpSocket, SocketConfig};
use serde::Serialize;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Serialize)]
struct NavigateParams {
    url: String,
}

#[tokio::main]
async fn main() -> CdpResult<()> {
    fmt()
        .pretty()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = SocketConfig::default().with_command_timeout(Duration::from_secs(5));
    let socket = CdpSocket::connect("127.0.0.1:9222", config).await?;
    info!("CDP socket connected");

    socket.send_command("Page.enable", NoParams {}).await?;

    let params = NavigateParams {
        url: "https://www.rust-lang.org".to_string(),
    };
    let response = socket.send_command("Page.navigate", params).await?;

    info!("Chrome replied: {}", response);

    socket.close().await;
    Ok(())
}
