//! Wire codec: outbound commands are encoded to JSON text, inbound frames are
//! decoded into an [`Envelope`]. Params and results stay raw JSON so the core
//! never needs to know any domain's record shapes.

use crate::error::{CdpError, CdpResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;
use std::fmt;

/// An undecoded JSON payload, exactly as it appeared on the wire.
#[derive(Clone)]
pub struct RawPayload(Box<RawValue>);

impl RawPayload {
    pub fn new(raw: Box<RawValue>) -> Self {
        Self(raw)
    }

    /// Serializes `value` into a raw payload.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> CdpResult<Self> {
        Ok(Self(serde_json::value::to_raw_value(value)?))
    }

    fn null() -> CdpResult<Self> {
        Ok(Self(RawValue::from_string("null".to_owned())?))
    }

    /// The JSON text of the payload.
    pub fn get(&self) -> &str {
        self.0.get()
    }

    pub fn is_null(&self) -> bool {
        self.get() == "null"
    }

    /// Decodes the payload into the record type the caller expects for it.
    pub fn decode<T: DeserializeOwned>(&self) -> CdpResult<T> {
        Ok(serde_json::from_str(self.get())?)
    }

    pub fn to_value(&self) -> CdpResult<Value> {
        self.decode()
    }

    pub fn into_inner(self) -> Box<RawValue> {
        self.0
    }
}

impl fmt::Debug for RawPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

impl fmt::Display for RawPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

impl PartialEq for RawPayload {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

/// The `error` member of a failed response.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RemoteError {
    #[serde(default = "RemoteError::unknown_code")]
    pub code: i64,
    #[serde(default = "RemoteError::unknown_message")]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RemoteError {
    fn unknown_code() -> i64 {
        -1
    }

    fn unknown_message() -> String {
        "Unknown CDP error".to_string()
    }
}

impl From<RemoteError> for CdpError {
    fn from(err: RemoteError) -> Self {
        CdpError::ProtocolError {
            code: err.code,
            message: err.message,
            data: err.data.map(|data| match data {
                Value::String(text) => text,
                other => other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct WsCommand<'a> {
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a RawValue>,
}

/// Parameter placeholder for commands that take none; encodes as `{}`.
#[derive(Debug, Serialize, Clone, Copy, Default)]
pub struct NoParams {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFrame {
    id: Option<u64>,
    method: Option<String>,
    params: Option<Box<RawValue>>,
    result: Option<Box<RawValue>>,
    error: Option<RemoteError>,
    session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub id: u64,
    pub outcome: Result<RawPayload, RemoteError>,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub method: String,
    pub params: RawPayload,
    pub session_id: Option<String>,
}

impl Notification {
    /// Domain part of the method name, e.g. `Network` for `Network.requestWillBeSent`.
    pub fn domain(&self) -> &str {
        self.method
            .split_once('.')
            .map_or(self.method.as_str(), |(domain, _)| domain)
    }
}

/// One decoded inbound frame.
#[derive(Debug, Clone)]
pub enum Envelope {
    Response(Response),
    Notification(Notification),
}

pub fn encode_command(id: u64, method: &str, params: Option<&RawValue>) -> CdpResult<String> {
    let cmd = WsCommand { id, method, params };
    Ok(serde_json::to_string(&cmd)?)
}

/// Classifies a frame: anything carrying `id` is a response, otherwise it must
/// carry `method` to be a notification.
pub fn decode_frame(text: &str) -> CdpResult<Envelope> {
    let frame: WireFrame = serde_json::from_str(text)?;

    if let Some(id) = frame.id {
        let outcome = match (frame.error, frame.result) {
            (Some(error), _) => Err(error),
            (None, Some(result)) => Ok(RawPayload::new(result)),
            (None, None) => Ok(RawPayload::null()?),
        };
        return Ok(Envelope::Response(Response { id, outcome }));
    }

    match frame.method {
        Some(method) if !method.is_empty() => {
            let params = match frame.params {
                Some(params) => RawPayload::new(params),
                None => RawPayload::null()?,
            };
            Ok(Envelope::Notification(Notification {
                method,
                params,
                session_id: frame.session_id,
            }))
        }
        _ => Err(CdpError::MalformedFrame(
            "frame carries neither an id nor a method".to_string(),
        )),
    }
}
