//! 护理端使用的领域实体。
//!
//! 这些结构体既是服务器推送帧中 `payload` 字段的内容，也是护理端状态存储中保存的数据。
//! 所有结构体都在结构体级别标注了 `#[serde(default)]`：服务器漏发的字段会取默认值，
//! 多发的字段会被忽略，绝不会因为字段缺失导致整帧被丢弃。

use serde::{Deserialize, Serialize};

use crate::enums::NotificationLevel;

/// 患者当前状态的摘要。每次更新都整体替换 (后写者胜)，不做字段级合并。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct PatientStatusSummary {
    pub is_online: bool,
    pub last_activity: Option<String>,
    pub utterances_today: u32,
    pub avg_selection_time_ms: f64,
    pub current_emotion: String,
    pub active_input: String,
}

/// 一条发话记录。写入环形缓冲后不再修改。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SpeechLogEntry {
    pub text: String,
    pub timestamp: String,
    /// 生成阶段：1 = 本地快速，2 = 本地高质量，3 = 云端。
    pub generation_stage: u8,
    pub was_spoken: bool,
    /// 情感效价，取值范围 [-1, 1]。
    pub emotion_valence: f64,
}

/// 服务器推送给护理端的通知。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
    pub timestamp: String,
    pub requires_ack: bool,
}

impl Notification {
    pub fn is_emergency(&self) -> bool {
        self.level == NotificationLevel::Emergency
    }
}
