//! Wire messages exchanged with worker processes, one JSON object per line.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::WorkerError;

pub const PROTOCOL_VERSION: u8 = 1;

/// Parent -> worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParentMessage {
    #[serde(rename = "work.exec")]
    Exec {
        v: u8,
        ts: String,
        execution_id: String,
        script_id: String,
        params: Map<String, Value>,
    },

    #[serde(rename = "work.shutdown")]
    Shutdown { v: u8, ts: String },
}

impl ParentMessage {
    pub fn exec(execution_id: String, script_id: String, params: Map<String, Value>) -> Self {
        Self::Exec {
            v: PROTOCOL_VERSION,
            ts: now_rfc3339(),
            execution_id,
            script_id,
            params,
        }
    }

    pub fn shutdown() -> Self {
        Self::Shutdown {
            v: PROTOCOL_VERSION,
            ts: now_rfc3339(),
        }
    }
}

/// Worker -> parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    #[serde(rename = "worker.ready")]
    Ready { v: u8, ts: String, pid: u32 },

    #[serde(rename = "work.result")]
    Result {
        v: u8,
        ts: String,
        execution_id: String,
        ok: bool,
        #[serde(default)]
        value: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
}

impl WorkerMessage {
    pub fn ready() -> Self {
        Self::Ready {
            v: PROTOCOL_VERSION,
            ts: now_rfc3339(),
            pid: std::process::id(),
        }
    }

    pub fn result_ok(execution_id: String, value: Value) -> Self {
        Self::Result {
            v: PROTOCOL_VERSION,
            ts: now_rfc3339(),
            execution_id,
            ok: true,
            value: Some(value),
            error: None,
        }
    }

    pub fn result_err(execution_id: String, error: String) -> Self {
        Self::Result {
            v: PROTOCOL_VERSION,
            ts: now_rfc3339(),
            execution_id,
            ok: false,
            value: None,
            error: Some(error),
        }
    }
}

pub fn to_line<T: Serialize>(msg: &T) -> String {
    serde_json::to_string(msg).expect("protocol messages serialize infallibly")
}

pub fn from_line<'a, T: Deserialize<'a>>(line: &'a str) -> Result<T, WorkerError> {
    serde_json::from_str(line).map_err(|e| WorkerError::Protocol(format!("bad line: {e}")))
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
