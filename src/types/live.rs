use crate::types::timers::TimerId;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Messages pushed from the server down a live connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full snapshot of a user's timers. Clients replace their view with it.
    AllTimers { list: Vec<TimerView> },
}

impl ServerMessage {
    pub fn timers(&self) -> &[TimerView] {
        match self {
            ServerMessage::AllTimers { list } => list,
        }
    }
}

/// A timer as sent to clients. `progress` (active) and `duration` (stopped)
/// are in milliseconds and derived at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerView {
    pub id: TimerId,
    pub description: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub anomaly: bool,
}
