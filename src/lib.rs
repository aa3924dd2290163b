//! # cdp-socket
//!
//! The dispatch core of a Chrome DevTools Protocol client: one persistent
//! connection, any number of concurrent commands correlated back to their
//! callers by id, and notifications fanned out to handlers registered by
//! event name.
//!
//! Params and results cross the core as [`protocol::RawPayload`] (raw JSON
//! text); decoding into domain records happens at the edges.
//!
//! ## Examples
//! ### 1. Commands
//!
//! ```rust
//! use cdp_socket::config::SocketConfig;
//! use cdp_socket::error::CdpResult;
//! use cdp_socket::protocol::NoParams;
//! use cdp_socket::socket::CdpSocket;
//! use serde_json::json;
//!
//! # async fn doc_example() -> CdpResult<()> {
//! let socket = CdpSocket::connect("127.0.0.1:9222", SocketConfig::default()).await?;
//! socket.send_command("Page.enable", NoParams {}).await?;
//! let result = socket
//!     .send_command("Page.navigate", json!({"url": "https://www.rust-lang.org"}))
//!     .await?;
//! println!("frame: {}", result.to_value()?["frameId"]);
//! # Ok(())
//! # }
//! ```
//!
//! ### 2. Event handlers
//! Handlers run on the dispatcher task, in registration order. Anything slow
//! should be handed off, for instance through [`socket::CdpSocket::on_domain`].
//! A handler that sends follow-up commands should capture a
//! [`socket::WeakCdpSocket`], so it does not keep the connection alive.
//!
//! ```rust
//! use cdp_socket::config::SocketConfig;
//! use cdp_socket::error::CdpResult;
//! use cdp_socket::protocol::NoParams;
//! use cdp_socket::socket::CdpSocket;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct ConsoleProfileStarted {
//!     id: String,
//!     title: Option<String>,
//! }
//!
//! # async fn doc_example() -> CdpResult<()> {
//! let socket = CdpSocket::connect("127.0.0.1:9222", SocketConfig::default()).await?;
//! socket.on_event("Profiler.consoleProfileStarted", |event: ConsoleProfileStarted| {
//!     println!("profile {} started ({:?})", event.id, event.title);
//! });
//! socket.register_handler("Profiler.consoleProfileFinished", |params| {
//!     println!("profile finished: {} bytes", params.get().len());
//!     Ok(())
//! });
//! socket.send_command("Profiler.enable", NoParams {}).await?;
//! # Ok(())
//! # }
//! ```

mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event_filter;
mod pending;
pub mod protocol;
pub mod registry;
pub mod rest_client;
pub mod socket;
pub mod transport;
mod writer;

pub use config::SocketConfig;
pub use dispatcher::SocketState;
pub use error::{CdpError, CdpResult};
pub use protocol::{NoParams, Notification, RawPayload};
pub use socket::{CdpSocket, WeakCdpSocket};
