// common_models/src/ws_payloads.rs

//! WebSocket 帧的消息词汇表。
//!
//! 线上协议是"每帧一个 JSON 对象，以 `type` 字段作为判别字段"。这里为每个角色、每个方向
//! 各定义一个封闭的枚举，并通过 `#[serde(tag = "type")]` 直接映射到帧格式：
//!
//! - 服务器 → 护理端: [`CaregiverInbound`]
//! - 护理端 → 服务器: [`CaregiverOutbound`]
//! - 服务器 → 患者端: [`PatientInbound`]
//! - 患者端 → 服务器: [`PatientOutbound`]
//!
//! 入站枚举都带有一个 `#[serde(other)] Unknown` 成员：无法识别的 `type` 会被解码为 `Unknown`，
//! 由分发器显式地执行"丢弃未知消息"的策略 (向前兼容)。

use serde::{Deserialize, Serialize};

use crate::caregiver::{Notification, PatientStatusSummary, SpeechLogEntry};
use crate::patient::{CandidateSetPayload, IalEvent};

// --- 护理端消息类型 ---
pub const PATIENT_STATUS_UPDATE_MESSAGE_TYPE: &str = "patient_status_update";
pub const SPEECH_LOG_ENTRY_MESSAGE_TYPE: &str = "speech_log_entry";
pub const NOTIFICATION_MESSAGE_TYPE: &str = "notification";
pub const ACKNOWLEDGE_EMERGENCY_MESSAGE_TYPE: &str = "acknowledge_emergency";
pub const ACKNOWLEDGE_NOTIFICATION_MESSAGE_TYPE: &str = "acknowledge_notification";

// --- 患者端消息类型 ---
pub const CANDIDATE_UPDATE_MESSAGE_TYPE: &str = "candidate_update";
pub const TTS_READY_MESSAGE_TYPE: &str = "tts_ready";
pub const ERROR_MESSAGE_TYPE: &str = "error";
pub const GAZE_UPDATE_MESSAGE_TYPE: &str = "gaze_update";
pub const INPUT_EVENT_MESSAGE_TYPE: &str = "input_event";
pub const CANDIDATE_SELECTED_MESSAGE_TYPE: &str = "candidate_selected";

// --- 两端共用 ---
pub const EMERGENCY_ACK_MESSAGE_TYPE: &str = "emergency_ack";

/// 服务器推送给护理端的消息。
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaregiverInbound {
    PatientStatusUpdate {
        #[serde(default)]
        payload: PatientStatusSummary,
    },
    SpeechLogEntry {
        #[serde(default)]
        payload: SpeechLogEntry,
    },
    Notification {
        #[serde(default)]
        payload: Notification,
    },
    /// 服务器确认紧急事件已被处理。这是紧急状态解除的唯一权威来源。
    EmergencyAck {},
    #[serde(other)]
    Unknown,
}

impl CaregiverInbound {
    /// 消息的 `type` 判别字段，主要用于日志。
    pub fn message_type(&self) -> &'static str {
        match self {
            CaregiverInbound::PatientStatusUpdate { .. } => PATIENT_STATUS_UPDATE_MESSAGE_TYPE,
            CaregiverInbound::SpeechLogEntry { .. } => SPEECH_LOG_ENTRY_MESSAGE_TYPE,
            CaregiverInbound::Notification { .. } => NOTIFICATION_MESSAGE_TYPE,
            CaregiverInbound::EmergencyAck {} => EMERGENCY_ACK_MESSAGE_TYPE,
            CaregiverInbound::Unknown => "unknown",
        }
    }
}

/// 护理端发送给服务器的消息。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaregiverOutbound {
    AcknowledgeEmergency {},
    AcknowledgeNotification { index: usize },
}

/// 服务器推送给患者端的消息。
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatientInbound {
    CandidateUpdate {
        #[serde(default)]
        request_id: String,
        #[serde(default)]
        candidate_set: CandidateSetPayload,
        #[serde(default)]
        is_final: bool,
    },
    TtsReady {
        #[serde(default)]
        audio_url: String,
        #[serde(default)]
        text: String,
        #[serde(default)]
        duration_ms: u64,
    },
    EmergencyAck {
        #[serde(default)]
        notified_caregivers: Vec<String>,
    },
    /// 服务器对无法处理的上行消息的错误回复。
    Error {
        #[serde(default)]
        detail: String,
    },
    #[serde(other)]
    Unknown,
}

impl PatientInbound {
    pub fn message_type(&self) -> &'static str {
        match self {
            PatientInbound::CandidateUpdate { .. } => CANDIDATE_UPDATE_MESSAGE_TYPE,
            PatientInbound::TtsReady { .. } => TTS_READY_MESSAGE_TYPE,
            PatientInbound::EmergencyAck { .. } => EMERGENCY_ACK_MESSAGE_TYPE,
            PatientInbound::Error { .. } => ERROR_MESSAGE_TYPE,
            PatientInbound::Unknown => "unknown",
        }
    }
}

/// 患者端发送给服务器的消息。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatientOutbound {
    GazeUpdate {
        zone_id: i32,
        confidence: f64,
        timestamp_ms: i64,
    },
    InputEvent {
        event: IalEvent,
    },
    CandidateSelected {
        request_id: String,
        candidate_index: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::NotificationLevel;

    #[test]
    fn test_caregiver_inbound_decoding() {
        let msg: CaregiverInbound = serde_json::from_str(
            r#"{"type":"notification","payload":{"level":"emergency","title":"緊急通報","body":"...","timestamp":"2024-01-01T00:00:00Z","requires_ack":true}}"#,
        )
        .unwrap();
        match msg {
            CaregiverInbound::Notification { payload } => {
                assert_eq!(payload.level, NotificationLevel::Emergency);
                assert_eq!(payload.title, "緊急通報");
            }
            other => panic!("期望 Notification，实际为 {:?}", other),
        }

        let ack: CaregiverInbound = serde_json::from_str(r#"{"type":"emergency_ack"}"#).unwrap();
        assert_eq!(ack, CaregiverInbound::EmergencyAck {});
        // 多余字段被忽略
        let ack: CaregiverInbound =
            serde_json::from_str(r#"{"type":"emergency_ack","notified_caregivers":["a"]}"#).unwrap();
        assert_eq!(ack.message_type(), EMERGENCY_ACK_MESSAGE_TYPE);
    }

    #[test]
    fn test_unknown_type_decodes_to_unknown() {
        let msg: CaregiverInbound = serde_json::from_str(r#"{"type":"weather_report","x":1}"#).unwrap();
        assert_eq!(msg, CaregiverInbound::Unknown);
        let msg: PatientInbound = serde_json::from_str(r#"{"type":"calibration_hint"}"#).unwrap();
        assert_eq!(msg, PatientInbound::Unknown);
    }

    #[test]
    fn test_missing_type_is_an_error() {
        assert!(serde_json::from_str::<CaregiverInbound>(r#"{"payload":{}}"#).is_err());
        assert!(serde_json::from_str::<PatientInbound>(r#""candidate_update""#).is_err());
    }

    #[test]
    fn test_outbound_wire_format() {
        let ack = serde_json::to_value(CaregiverOutbound::AcknowledgeEmergency {}).unwrap();
        assert_eq!(ack, serde_json::json!({"type": "acknowledge_emergency"}));

        let selected = serde_json::to_value(PatientOutbound::CandidateSelected {
            request_id: "r1".to_string(),
            candidate_index: 2,
        })
        .unwrap();
        assert_eq!(
            selected,
            serde_json::json!({"type": "candidate_selected", "request_id": "r1", "candidate_index": 2})
        );
    }

    #[test]
    fn test_candidate_update_with_missing_fields() {
        let msg: PatientInbound =
            serde_json::from_str(r#"{"type":"candidate_update","request_id":"r9"}"#).unwrap();
        match msg {
            PatientInbound::CandidateUpdate { request_id, candidate_set, is_final } => {
                assert_eq!(request_id, "r9");
                assert!(candidate_set.candidates.is_empty());
                assert!(!is_final);
            }
            other => panic!("期望 CandidateUpdate，实际为 {:?}", other),
        }
    }
}
