// CaregiverConsole/src/event.rs

//! 护理端状态存储对外发布的事件。
//!
//! 状态存储每提交一次具名变更，就按提交顺序向所有订阅者发布一个 [`StoreEvent`]。
//! 界面层 (不在本仓库中) 通过订阅这些事件来刷新显示。

use common_models::enums::TransitionAuthority;
use rust_websocket_utils::client::ConnectionState;
use serde::Serialize;

use crate::emergency::EmergencyPhase;
use crate::state::{EmergencyRecord, View};

/// 连接状态变化事件的名称。
pub const CONNECTION_STATE_EVENT: &str = "caregiver://connection-state";
/// 患者状态摘要被替换。
pub const PATIENT_STATUS_EVENT: &str = "caregiver://patient-status";
/// 发话日志新增条目。
pub const SPEECH_LOG_EVENT: &str = "caregiver://speech-log";
/// 通知列表变化 (新增或移除)。
pub const NOTIFICATIONS_EVENT: &str = "caregiver://notifications";
/// 紧急记录或紧急状态机阶段变化。
pub const EMERGENCY_EVENT: &str = "caregiver://emergency";
/// 当前视图变化。
pub const VIEW_EVENT: &str = "caregiver://view";

/// 一次已提交的状态变更。
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    ConnectionStateChanged { state: ConnectionState },
    ReconnectExhaustedChanged { exhausted: bool },
    PatientStatusReplaced,
    SpeechLogAppended { evicted_oldest: bool },
    NotificationAdded { id: u64 },
    NotificationRemoved { id: u64 },
    EmergencyRecordChanged { record: EmergencyRecord },
    EmergencyPhaseChanged {
        from: EmergencyPhase,
        to: EmergencyPhase,
        authority: TransitionAuthority,
    },
    ViewChanged { view: View },
}

impl StoreEvent {
    /// 事件所属的通道名称。
    pub fn event_name(&self) -> &'static str {
        match self {
            StoreEvent::ConnectionStateChanged { .. } | StoreEvent::ReconnectExhaustedChanged { .. } => {
                CONNECTION_STATE_EVENT
            }
            StoreEvent::PatientStatusReplaced => PATIENT_STATUS_EVENT,
            StoreEvent::SpeechLogAppended { .. } => SPEECH_LOG_EVENT,
            StoreEvent::NotificationAdded { .. } | StoreEvent::NotificationRemoved { .. } => NOTIFICATIONS_EVENT,
            StoreEvent::EmergencyRecordChanged { .. } | StoreEvent::EmergencyPhaseChanged { .. } => EMERGENCY_EVENT,
            StoreEvent::ViewChanged { .. } => VIEW_EVENT,
        }
    }
}
