use std::time::Duration;

use serde_json::{Map, Value};

use crate::types::WorkItem;

/// Engine lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotStarted,
    Started,
    Stopped,
}

impl EngineState {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => EngineState::Started,
            2 => EngineState::Stopped,
            _ => EngineState::NotStarted,
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            EngineState::NotStarted => 0,
            EngineState::Started => 1,
            EngineState::Stopped => 2,
        }
    }
}

/// A task that cleared pre-dispatch: references resolved, parameters
/// coerced, execution budget fixed. This is what the pool executes.
#[derive(Debug, Clone)]
pub struct ReadyTask {
    pub item: WorkItem,
    pub params: Map<String, Value>,
    pub timeout: Duration,
}
