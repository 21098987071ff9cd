// PatientTerminal/src/event.rs

//! 患者端状态存储对外发布的事件。

use common_models::enums::TransitionAuthority;
use rust_websocket_utils::client::ConnectionState;
use serde::Serialize;

use crate::state::InputMode;

pub const CONNECTION_STATE_EVENT: &str = "patient://connection-state";
pub const INPUT_MODE_EVENT: &str = "patient://input-mode";
pub const GAZE_ZONE_EVENT: &str = "patient://gaze-zone";
/// 候选集合被替换或清空。
pub const CANDIDATES_EVENT: &str = "patient://candidates";
pub const HISTORY_EVENT: &str = "patient://history";
/// 语音就绪或服务器错误。
pub const SERVER_NOTICE_EVENT: &str = "patient://server-notice";

/// 一次已提交的状态变更。
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    ConnectionStateChanged { state: ConnectionState },
    ReconnectExhaustedChanged { exhausted: bool },
    InputModeChanged {
        from: InputMode,
        to: InputMode,
        authority: TransitionAuthority,
    },
    GazeZoneChanged { zone: i32 },
    CandidatesReplaced {
        request_id: String,
        count: usize,
        is_final: bool,
    },
    CandidatesCleared { request_id: String },
    HistoryAppended { evicted_oldest: bool },
    TtsAnnounced { text: String },
    ServerErrorRecorded { detail: String },
}

impl StoreEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            StoreEvent::ConnectionStateChanged { .. } | StoreEvent::ReconnectExhaustedChanged { .. } => {
                CONNECTION_STATE_EVENT
            }
            StoreEvent::InputModeChanged { .. } => INPUT_MODE_EVENT,
            StoreEvent::GazeZoneChanged { .. } => GAZE_ZONE_EVENT,
            StoreEvent::CandidatesReplaced { .. } | StoreEvent::CandidatesCleared { .. } => CANDIDATES_EVENT,
            StoreEvent::HistoryAppended { .. } => HISTORY_EVENT,
            StoreEvent::TtsAnnounced { .. } | StoreEvent::ServerErrorRecorded { .. } => SERVER_NOTICE_EVENT,
        }
    }
}
