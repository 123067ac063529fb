//! JSON-lines framing between warden and the sidecar.
//!
//! Outbound: `{"id": 7, "method": "sendMessage", "params": {...}}`
//! Inbound: either a reply `{"replyTo": 7, "result": ...}` / `{"replyTo": 7, "error": "..."}`
//! or an event tagged with `"event"`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::ProtocolEvent;

#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl Request<'_> {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub reply_to: u64,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl Reply {
    pub fn into_result(self) -> Result<Value, String> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result),
        }
    }
}

/// Reply is tried first so a reply never parses as an event.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Reply(Reply),
    Event(Box<ProtocolEvent>),
}

pub fn decode(line: &str) -> Result<Inbound, serde_json::Error> {
    serde_json::from_str(line)
}
