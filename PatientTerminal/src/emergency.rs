// PatientTerminal/src/emergency.rs

//! 患者端紧急输入。
//!
//! 触发紧急事件时立即切换到紧急模式 (乐观) 并发送 `input_event{EMERGENCY}`。
//! 收到服务器的 `emergency_ack` 后安排一个带模式纪元的恢复定时器，到期时如果模式在此期间
//! 没有再变化，则回到候选模式。

use std::time::Duration;

use common_models::enums::{InputSource, TransitionAuthority};
use common_models::patient::{emergency_category, IalEvent};
use common_models::ws_payloads::PatientOutbound;
use log::{debug, info, warn};
use rust_websocket_utils::client::{FrameSender, SendOutcome};
use rust_websocket_utils::message::encode_frame;

use crate::state::{InputMode, PatientStore};

/// 一个待执行的模式恢复。`epoch` 是安排时的模式纪元。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevertTimer {
    pub epoch: u64,
    pub delay: Duration,
}

/// 触发紧急事件。`category` 为紧急类别编号，随事件作为 `target_id` 发送。
///
/// 无论消息是否发送成功，模式都切换为紧急模式。
pub fn trigger(
    store: &mut PatientStore,
    sender: &mut dyn FrameSender,
    source: InputSource,
    category: Option<i32>,
) -> SendOutcome {
    if let Some(id) = category {
        match emergency_category(id) {
            Some(c) => info!("[患者端紧急] 触发紧急事件: {}", c.label),
            None => warn!("[患者端紧急] 未知的紧急类别 {}，仍按紧急事件发送", id),
        }
    } else {
        info!("[患者端紧急] 触发紧急事件 (来源: {:?})", source);
    }

    store.set_input_mode(InputMode::Emergency, TransitionAuthority::Optimistic);
    let event = PatientOutbound::InputEvent {
        event: IalEvent::emergency(source, category),
    };
    match encode_frame(&event) {
        Ok(frame) => sender.send_text(frame),
        Err(e) => {
            warn!("[患者端紧急] 编码紧急事件失败: {}", e);
            SendOutcome::Dropped
        }
    }
}

/// 患者取消紧急模式，回到候选模式。不发送任何消息。
pub fn cancel(store: &mut PatientStore) -> bool {
    if store.input_mode() != InputMode::Emergency {
        return false;
    }
    info!("[患者端紧急] 患者取消了紧急模式");
    store.set_input_mode(InputMode::Candidate, TransitionAuthority::Optimistic)
}

/// 收到 `emergency_ack`。仍处于紧急模式时返回需要安排的恢复定时器。
pub fn on_emergency_ack(store: &PatientStore, notified_caregivers: &[String], delay: Duration) -> Option<RevertTimer> {
    info!("[患者端紧急] 服务器已确认紧急事件，已通知护理者: {:?}", notified_caregivers);
    if store.input_mode() != InputMode::Emergency {
        debug!("[患者端紧急] 当前不在紧急模式，无需恢复");
        return None;
    }
    Some(RevertTimer {
        epoch: store.mode_epoch(),
        delay,
    })
}

/// 恢复定时器到期。模式纪元未变化时回到候选模式。
pub fn on_revert_due(store: &mut PatientStore, epoch: u64) -> bool {
    if store.mode_epoch() != epoch {
        debug!("[患者端紧急] 忽略过期的模式恢复 (纪元 {}，当前 {})", epoch, store.mode_epoch());
        return false;
    }
    store.set_input_mode(InputMode::Candidate, TransitionAuthority::ServerConfirmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_websocket_utils::client::RecordingSender;

    const DELAY: Duration = Duration::from_millis(5000);

    #[test]
    fn test_trigger_is_optimistic_and_sends_input_event() {
        let mut store = PatientStore::new(50);
        let mut sender = RecordingSender::disconnected();
        assert_eq!(trigger(&mut store, &mut sender, InputSource::Keyboard, None), SendOutcome::Dropped);
        assert_eq!(store.input_mode(), InputMode::Emergency);

        let mut sender = RecordingSender::connected();
        trigger(&mut store, &mut sender, InputSource::Gaze, Some(2));
        let sent = sender.sent_json();
        assert_eq!(sent[0]["type"], "input_event");
        assert_eq!(sent[0]["event"]["event_type"], "EMERGENCY");
        assert_eq!(sent[0]["event"]["source"], "gaze");
        assert_eq!(sent[0]["event"]["target_id"], 2);
        assert_eq!(sent[0]["event"]["confidence"], 1.0);
    }

    #[test]
    fn test_ack_schedules_revert_that_returns_to_candidate() {
        let mut store = PatientStore::new(50);
        let mut sender = RecordingSender::connected();
        trigger(&mut store, &mut sender, InputSource::Keyboard, None);

        let timer = on_emergency_ack(&store, &["caregiver-1".to_string()], DELAY).unwrap();
        assert_eq!(timer.delay, DELAY);
        assert!(on_revert_due(&mut store, timer.epoch));
        assert_eq!(store.input_mode(), InputMode::Candidate);
    }

    #[test]
    fn test_stale_revert_is_ignored() {
        let mut store = PatientStore::new(50);
        let mut sender = RecordingSender::connected();
        trigger(&mut store, &mut sender, InputSource::Keyboard, None);
        let timer = on_emergency_ack(&store, &[], DELAY).unwrap();

        // 恢复前患者取消并再次触发
        assert!(cancel(&mut store));
        trigger(&mut store, &mut sender, InputSource::Keyboard, None);
        assert!(!on_revert_due(&mut store, timer.epoch));
        assert_eq!(store.input_mode(), InputMode::Emergency);
    }

    #[test]
    fn test_ack_outside_emergency_mode_schedules_nothing() {
        let mut store = PatientStore::new(50);
        assert!(on_emergency_ack(&store, &[], DELAY).is_none());
        assert!(!cancel(&mut store));
    }
}
