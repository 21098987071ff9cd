// CaregiverConsole/src/emergency.rs

//! 护理端紧急状态机: `Idle → Active → Acknowledging → Idle`。
//!
//! - 只有服务器推送的 `emergency` 级别通知能进入 `Active`。
//! - 护理者确认时发送 `acknowledge_emergency` 并进入 `Acknowledging`，紧急记录保持激活。
//! - 只有服务器的 `emergency_ack` 能回到 `Idle` 并清除紧急记录。
//!
//! 当前阶段保存在 [`CaregiverStore`] 中，使快照与订阅者能看到它。

use common_models::caregiver::Notification;
use common_models::enums::TransitionAuthority;
use common_models::ws_payloads::CaregiverOutbound;
use log::{info, warn};
use rust_websocket_utils::client::{FrameSender, SendOutcome};
use rust_websocket_utils::message::encode_frame;
use serde::Serialize;

use crate::state::{CaregiverStore, EmergencyRecord, View};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyPhase {
    #[default]
    Idle,
    Active,
    /// 已发送确认，等待服务器的 `emergency_ack`。
    Acknowledging,
}

/// 一次状态迁移。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyTransition {
    pub from: EmergencyPhase,
    pub to: EmergencyPhase,
    pub authority: TransitionAuthority,
}

/// 护理者确认紧急事件的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcknowledgeOutcome {
    /// 确认已发送。
    Sent(EmergencyTransition),
    /// 没有未解决的紧急事件。
    NothingToAcknowledge,
    /// 连接不可用，确认被丢弃，阶段保持不变，可以稍后重试。
    Dropped,
}

fn transition(store: &mut CaregiverStore, to: EmergencyPhase, authority: TransitionAuthority) -> EmergencyTransition {
    let from = store.emergency_phase();
    store.set_emergency_phase(to, authority);
    EmergencyTransition { from, to, authority }
}

/// 通知自带的时间戳；服务器未提供时使用本地接收时间。
fn received_at(notification: &Notification) -> String {
    if notification.timestamp.is_empty() {
        chrono::Utc::now().to_rfc3339()
    } else {
        notification.timestamp.clone()
    }
}

/// 收到 `emergency` 级别的通知。
///
/// 无论当前处于哪个阶段都进入 `Active`：新的紧急事件需要重新确认。
pub fn on_emergency_notification(store: &mut CaregiverStore, notification: &Notification) -> EmergencyTransition {
    info!("[紧急状态机] 收到紧急通知: {}", notification.title);
    store.set_emergency(EmergencyRecord {
        active: true,
        timestamp: Some(received_at(notification)),
        category: Some(notification.title.clone()).filter(|t| !t.is_empty()),
    });
    store.navigate(View::Emergency);
    transition(store, EmergencyPhase::Active, TransitionAuthority::ServerConfirmed)
}

/// 护理者确认紧急事件。
///
/// 在 `Acknowledging` 阶段再次确认会重新发送确认消息，阶段不变。
pub fn acknowledge(store: &mut CaregiverStore, sender: &mut dyn FrameSender) -> AcknowledgeOutcome {
    let phase = store.emergency_phase();
    if phase == EmergencyPhase::Idle {
        info!("[紧急状态机] 当前没有未解决的紧急事件，忽略确认请求");
        return AcknowledgeOutcome::NothingToAcknowledge;
    }

    let frame = match encode_frame(&CaregiverOutbound::AcknowledgeEmergency {}) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("[紧急状态机] 编码确认消息失败: {}", e);
            return AcknowledgeOutcome::Dropped;
        }
    };
    match sender.send_text(frame) {
        SendOutcome::Sent => AcknowledgeOutcome::Sent(transition(
            store,
            EmergencyPhase::Acknowledging,
            TransitionAuthority::Optimistic,
        )),
        SendOutcome::Dropped => {
            warn!("[紧急状态机] 确认消息未能发送，保持 {:?} 阶段", phase);
            AcknowledgeOutcome::Dropped
        }
    }
}

/// 收到服务器的 `emergency_ack`。
///
/// 也可能来自其他护理者的确认，因此在 `Active` 阶段同样生效。`Idle` 阶段返回 `None`。
pub fn on_emergency_ack(store: &mut CaregiverStore) -> Option<EmergencyTransition> {
    store.clear_emergency();
    if store.emergency_phase() == EmergencyPhase::Idle {
        return None;
    }
    info!("[紧急状态机] 服务器已确认紧急事件，解除紧急状态");
    Some(transition(store, EmergencyPhase::Idle, TransitionAuthority::ServerConfirmed))
}
