use cdp_socket::error::CdpResult;
use cdp_socket::protocol::NoParams;
use cdp_socket::{CdpSocket, SocketConfig};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsoleProfileFinished {
    id: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeapStatsUpdate {
    stats_update: Vec<i64>,
}

#[tokio::main]
async fn main() -> CdpResult<()> {
    fmt()
        .pretty()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let socket = CdpSocket::connect("127.0.0.1:9222", SocketConfig::default()).await?;

    socket.on_event(
        "Profiler.consoleProfileFinished",
        |event: ConsoleProfileFinished| {
            info!("⏱️ Profile {} finished ({:?})", event.id, event.title);
        },
    );
    socket.on_event("HeapProfiler.heapStatsUpdate", |event: HeapStatsUpdate| {
        info!("🧠 Heap stats: {} values", event.stats_update.len());
    });

    socket.send_command("Profiler.enable", NoParams {}).await?;
    socket
        .send_command("Profiler.setSamplingInterval", json!({"interval": 100}))
        .await?;
    socket.send_command("Profiler.start", NoParams {}).await?;
    socket.send_command("HeapProfiler.enable", NoParams {}).await?;
    socket
        .send_command("HeapProfiler.startTrackingHeapObjects", json!({"trackAllocations": false}))
        .await?;

    socket
        .send_command(
            "Runtime.evaluate",
            json!({"expression": "console.profile('demo'); for (let i = 0; i < 1e6; i++) {} console.profileEnd('demo');"}),
        )
        .await?;

    tokio::time::sleep(Duration::from_secs(2)).await;

    let profile = socket.send_command("Profiler.stop", NoParams {}).await?;
    info!("📈 Profile payload: {} bytes", profile.get().len());

    if let Err(e) = socket
        .send_command("HeapProfiler.stopTrackingHeapObjects", NoParams {})
        .await
    {
        warn!("Stopping heap tracking failed: {}", e);
    }

    socket.close().await;
    Ok(())
}
