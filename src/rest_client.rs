use crate::error::{CdpError, CdpResult};
use serde::Deserialize;
use tracing::debug;

/// One entry of the DevTools HTTP target listing.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChromeTarget {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub r#type: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: String,
}

pub async fn list_targets(host: &str) -> CdpResult<Vec<ChromeTarget>> {
    let url = format!("http://{}/json/list", host);
    Ok(reqwest::get(&url).await?.error_for_status()?.json().await?)
}

/// The first attachable page. Targets already attached by another client have
/// no debugger URL and are skipped.
pub fn select_page_target(targets: Vec<ChromeTarget>) -> Option<ChromeTarget> {
    targets
        .into_iter()
        .find(|t| t.r#type == "page" && !t.web_socket_debugger_url.is_empty())
}

pub async fn get_websocket_url(host: &str) -> CdpResult<String> {
    let target = select_page_target(list_targets(host).await?)
        .ok_or_else(|| CdpError::NoPageTargetFound(host.to_string()))?;

    debug!("Found target: {} - {}", target.title, target.url);

    Ok(target.web_socket_debugger_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_first_attachable_page() {
        let listing = r#"[
            {"id":"A","type":"service_worker","title":"sw","url":"https://a/sw.js",
             "webSocketDebuggerUrl":"ws://127.0.0.1:9222/devtools/page/A"},
            {"id":"B","type":"page","title":"attached","url":"https://b/"},
            {"id":"C","type":"page","title":"Rust","url":"https://www.rust-lang.org/",
             "webSocketDebuggerUrl":"ws://127.0.0.1:9222/devtools/page/C"}
        ]"#;
        let targets: Vec<ChromeTarget> = serde_json::from_str(listing).unwrap();

        let target = select_page_target(targets).unwrap();
        assert_eq!(target.id, "C");
        assert_eq!(
            target.web_socket_debugger_url,
            "ws://127.0.0.1:9222/devtools/page/C"
        );
    }

    #[test]
    fn test_no_page_target() {
        let targets: Vec<ChromeTarget> =
            serde_json::from_str(r#"[{"type":"browser","title":"b"}]"#).unwrap();
        assert!(select_page_target(targets).is_none());
    }
}
