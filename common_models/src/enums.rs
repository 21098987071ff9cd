//! 通用枚举模块。
//!
//! 本模块定义了护理端 (`CaregiverConsole`) 与患者端 (`PatientTerminal`) 之间共享的枚举类型，
//! 包括客户端角色、通知级别、IAL 输入事件的各个取值以及状态迁移的权威来源。
//!
//! 线上协议中的字符串取值 (例如 `"emergency"`、`"SELECT"`) 通过 serde 的 `rename_all` 固定下来，
//! 因此这里的枚举成员名称可以遵循 Rust 的命名习惯，而不会影响 JSON 帧的格式。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 表示 WebSocket 客户端在系统中所扮演的角色。
///
/// 两个角色共享同一套连接与状态同步设计，但各自连接到不同的端点路径，
/// 并使用不同的重连策略与消息词汇表。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// 护理端监控控制台。
    Caregiver,
    /// 患者端眼动/注视交流终端。
    Patient,
}

impl ClientRole {
    /// 该角色在后端上的 WebSocket 端点路径后缀。
    pub const fn endpoint_path(self) -> &'static str {
        match self {
            ClientRole::Caregiver => "/ws/caregiver",
            ClientRole::Patient => "/ws/patient",
        }
    }

    /// 拼接出该角色完整的 WebSocket 端点 URL。
    ///
    /// `base_url` 末尾多余的 `/` 会被去掉，例如 `"ws://127.0.0.1:8765/"` 与
    /// `"ws://127.0.0.1:8765"` 得到相同的结果。
    pub fn endpoint_url(self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.endpoint_path())
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 护理端通知的级别。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    #[default]
    Info,
    Warning,
    Emergency,
}

/// IAL 事件的动作类型。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Select,
    Confirm,
    Cancel,
    Emergency,
    Scroll,
}

/// IAL 事件的输入来源 (模态)。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    Gaze,
    Finger,
    Blink,
    Keyboard,
}

/// `SCROLL` 事件的方向。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// 候选短语的意图轴。
///
/// 服务器未来可能增加新的意图轴，无法识别的取值统一落入 `Other`，而不是让整帧解码失败。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntentAxis {
    EmotionalResponse,
    Question,
    SelfReference,
    OtherReference,
    ActionRequest,
    Humor,
    TopicChange,
    #[default]
    #[serde(other)]
    Other,
}

/// 状态迁移的权威来源。
///
/// 每个领域状态机的迁移都会带上这个标记，用来区分"本地立即生效" (乐观) 与
/// "必须等待服务器确认" 两类迁移，测试可以据此断言到底是哪一方驱动了状态。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAuthority {
    /// 本地动作立即生效，不等待服务器。
    Optimistic,
    /// 只有收到服务器消息后才生效。
    ServerConfirmed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_role_endpoint_url() {
        assert_eq!(
            ClientRole::Caregiver.endpoint_url("ws://127.0.0.1:8765"),
            "ws://127.0.0.1:8765/ws/caregiver"
        );
        // 末尾的斜杠不应产生双斜杠
        assert_eq!(
            ClientRole::Patient.endpoint_url("ws://127.0.0.1:8765/"),
            "ws://127.0.0.1:8765/ws/patient"
        );
    }

    #[test]
    fn test_wire_spelling_of_enums() {
        assert_eq!(serde_json::to_string(&EventType::Emergency).unwrap(), "\"EMERGENCY\"");
        assert_eq!(serde_json::to_string(&InputSource::Keyboard).unwrap(), "\"keyboard\"");
        assert_eq!(serde_json::to_string(&NotificationLevel::Warning).unwrap(), "\"warning\"");
        assert_eq!(serde_json::to_string(&ScrollDirection::Left).unwrap(), "\"left\"");
    }

    #[test]
    fn test_unknown_intent_axis_falls_back_to_other() {
        let axis: IntentAxis = serde_json::from_str("\"sarcasm\"").unwrap();
        assert_eq!(axis, IntentAxis::Other);
        let axis: IntentAxis = serde_json::from_str("\"action_request\"").unwrap();
        assert_eq!(axis, IntentAxis::ActionRequest);
    }
}
