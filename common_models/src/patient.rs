//! 患者端使用的领域实体：候选短语、候选集合、IAL 输入事件以及紧急类别常量。

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::enums::{EventType, InputSource, IntentAxis, ScrollDirection};

/// 一个候选集合中最多包含的候选数量。
pub const MAX_CANDIDATES: usize = 4;

/// 表示"当前没有注视任何区域"的注视区域编号。
pub const NO_GAZE_ZONE: i32 = -1;

/// 服务器生成的一条候选短语。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Candidate {
    pub text: String,
    pub intent_axis: IntentAxis,
    pub confidence: f64,
    pub generation_stage: u8,
    pub latency_ms: f64,
}

/// `candidate_update` 帧中的 `candidate_set` 字段。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct CandidateSetPayload {
    pub candidates: Vec<Candidate>,
    pub stage: u8,
    pub request_id: String,
    pub timestamp_ms: i64,
    pub is_final: bool,
}

/// IAL (Intent/Action/Locus) 事件：一次离散的患者输入动作。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IalEvent {
    pub event_type: EventType,
    pub source: InputSource,
    /// 没有目标时序列化为 `null`，而不是省略该字段。
    pub target_id: Option<i32>,
    pub confidence: f64,
    pub timestamp_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_direction: Option<ScrollDirection>,
}

impl IalEvent {
    /// 以当前时间戳构造一个 IAL 事件。
    pub fn now(event_type: EventType, source: InputSource, target_id: Option<i32>, confidence: f64) -> Self {
        Self {
            event_type,
            source,
            target_id,
            confidence,
            timestamp_ms: Utc::now().timestamp_millis(),
            scroll_direction: None,
        }
    }

    /// 构造一个紧急事件。`category` 为紧急类别编号 (见 [`EMERGENCY_CATEGORIES`])，作为 `target_id` 发送。
    pub fn emergency(source: InputSource, category: Option<i32>) -> Self {
        Self::now(EventType::Emergency, source, category, 1.0)
    }
}

/// 紧急类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyCategory {
    pub id: i32,
    pub label: &'static str,
}

/// 患者可以选择的紧急类别。
pub const EMERGENCY_CATEGORIES: [EmergencyCategory; 4] = [
    EmergencyCategory { id: 0, label: "呼吸が苦しい" },
    EmergencyCategory { id: 1, label: "強い痛み" },
    EmergencyCategory { id: 2, label: "吸引が必要" },
    EmergencyCategory { id: 3, label: "人を呼んで" },
];

/// 按编号查找紧急类别。
pub fn emergency_category(id: i32) -> Option<EmergencyCategory> {
    EMERGENCY_CATEGORIES.iter().copied().find(|c| c.id == id)
}
