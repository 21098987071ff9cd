// CaregiverConsole/src/ws_client/dispatcher.rs

//! 护理端入站消息分发器。
//!
//! 把一个原始文本帧解码为 [`CaregiverInbound`]，并交给唯一的处理分支。
//! 解码失败、缺少 `type` 或未知 `type` 的帧只记录调试日志，不修改任何状态。

use common_models::ws_payloads::CaregiverInbound;
use log::debug;
use rust_websocket_utils::message::decode_frame;

use crate::emergency;
use crate::notification::{DeliveryRequest, NotificationEngine};
use crate::state::CaregiverStore;

/// 分发一帧后产生的结果，主要用于日志与测试断言。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    PatientStatus,
    SpeechLog,
    Notification { id: u64, emergency: bool },
    EmergencyAck,
    /// 合法的帧，但 `type` 未知。
    Ignored,
    /// 帧无法解码，已丢弃。
    Dropped,
}

/// 解码并处理一个文本帧。
pub fn dispatch_frame(text: &str, store: &mut CaregiverStore, notifier: &mut NotificationEngine) -> Dispatched {
    match decode_frame::<CaregiverInbound>(text) {
        Ok(message) => dispatch(message, store, notifier),
        Err(e) => {
            debug!("[护理端分发器] 丢弃无法解码的帧: {} (原始内容: {})", e, text);
            Dispatched::Dropped
        }
    }
}

/// 处理一条已解码的消息。
pub fn dispatch(message: CaregiverInbound, store: &mut CaregiverStore, notifier: &mut NotificationEngine) -> Dispatched {
    debug!("[护理端分发器] 处理消息: {}", message.message_type());
    match message {
        CaregiverInbound::PatientStatusUpdate { payload } => {
            store.replace_patient_status(payload);
            Dispatched::PatientStatus
        }
        CaregiverInbound::SpeechLogEntry { payload } => {
            store.append_speech_log(payload);
            Dispatched::SpeechLog
        }
        CaregiverInbound::Notification { payload } => {
            let is_emergency = payload.is_emergency();
            let request = DeliveryRequest::from_notification(&payload);
            if is_emergency {
                emergency::on_emergency_notification(store, &payload);
            }
            let id = store.add_notification(payload);
            notifier.deliver(request);
            Dispatched::Notification {
                id,
                emergency: is_emergency,
            }
        }
        CaregiverInbound::EmergencyAck {} => {
            emergency::on_emergency_ack(store);
            Dispatched::EmergencyAck
        }
        CaregiverInbound::Unknown => {
            debug!("[护理端分发器] 忽略未知类型的消息");
            Dispatched::Ignored
        }
    }
}
