// CaregiverConsole/src/state.rs

//! 护理端状态存储。
//!
//! `CaregiverStore` 是护理端客户端状态的唯一权威副本，只由客户端服务的事件循环持有和修改
//! (单写者)。每一次修改都是一个具名操作，提交后按提交顺序向订阅者发布 [`StoreEvent`]。

use common_models::caregiver::{Notification, PatientStatusSummary, SpeechLogEntry};
use common_models::enums::TransitionAuthority;
use common_models::history::BoundedLog;
use log::debug;
use rust_websocket_utils::client::ConnectionState;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::emergency::EmergencyPhase;
use crate::event::StoreEvent;

/// 发话日志的容量。
pub const SPEECH_LOG_CAPACITY: usize = 100;

/// 护理端界面的视图。
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Dashboard,
    Log,
    Emergency,
}

/// 当前未解决的紧急事件。同一时间只有一个。
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct EmergencyRecord {
    pub active: bool,
    pub timestamp: Option<String>,
    /// 紧急通知的标题，例如 `"緊急通報"`。
    pub category: Option<String>,
}

/// 存储中的通知，附带一个本地分配的标识。
///
/// 移除通知时按标识查找，而不是按列表下标，因此在确认请求与新通知到达交错时不会删错条目。
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StoredNotification {
    pub id: u64,
    pub notification: Notification,
}

/// 某一时刻护理端状态的只读副本。
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CaregiverSnapshot {
    pub connection_state: ConnectionState,
    /// 有限重试策略已用尽，需要手动重连。
    pub reconnect_exhausted: bool,
    pub patient_status: Option<PatientStatusSummary>,
    /// 最新在前。
    pub speech_log: Vec<SpeechLogEntry>,
    /// 按到达顺序。
    pub notifications: Vec<StoredNotification>,
    pub emergency: EmergencyRecord,
    pub emergency_phase: EmergencyPhase,
    pub view: View,
}

pub struct CaregiverStore {
    connection_state: ConnectionState,
    reconnect_exhausted: bool,
    patient_status: Option<PatientStatusSummary>,
    speech_log: BoundedLog<SpeechLogEntry>,
    notifications: Vec<StoredNotification>,
    next_notification_id: u64,
    emergency: EmergencyRecord,
    emergency_phase: EmergencyPhase,
    view: View,
    subscribers: Vec<mpsc::UnboundedSender<StoreEvent>>,
}

impl Default for CaregiverStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CaregiverStore {
    pub fn new() -> Self {
        Self {
            connection_state: ConnectionState::Idle,
            reconnect_exhausted: false,
            patient_status: None,
            speech_log: BoundedLog::with_capacity(SPEECH_LOG_CAPACITY),
            notifications: Vec::new(),
            next_notification_id: 1,
            emergency: EmergencyRecord::default(),
            emergency_phase: EmergencyPhase::Idle,
            view: View::Dashboard,
            subscribers: Vec::new(),
        }
    }

    /// 订阅此后提交的所有变更。
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StoreEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, event: StoreEvent) {
        debug!("[护理端状态] 提交变更 {}: {:?}", event.event_name(), event);
        // 顺便清理已经关闭的订阅者
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // --- 读取 ---

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn reconnect_exhausted(&self) -> bool {
        self.reconnect_exhausted
    }

    pub fn patient_status(&self) -> Option<&PatientStatusSummary> {
        self.patient_status.as_ref()
    }

    pub fn speech_log(&self) -> &BoundedLog<SpeechLogEntry> {
        &self.speech_log
    }

    pub fn notifications(&self) -> &[StoredNotification] {
        &self.notifications
    }

    /// 通知当前在列表中的位置，即发送给服务器的 `index`。
    pub fn notification_index(&self, id: u64) -> Option<usize> {
        self.notifications.iter().position(|n| n.id == id)
    }

    pub fn emergency(&self) -> &EmergencyRecord {
        &self.emergency
    }

    pub fn emergency_phase(&self) -> EmergencyPhase {
        self.emergency_phase
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn snapshot(&self) -> CaregiverSnapshot {
        CaregiverSnapshot {
            connection_state: self.connection_state,
            reconnect_exhausted: self.reconnect_exhausted,
            patient_status: self.patient_status.clone(),
            speech_log: self.speech_log.to_vec_newest_first(),
            notifications: self.notifications.clone(),
            emergency: self.emergency.clone(),
            emergency_phase: self.emergency_phase,
            view: self.view,
        }
    }

    // --- 具名变更 ---

    pub fn set_connection_state(&mut self, state: ConnectionState) {
        if self.connection_state == state {
            return;
        }
        self.connection_state = state;
        self.publish(StoreEvent::ConnectionStateChanged { state });
    }

    pub fn set_reconnect_exhausted(&mut self, exhausted: bool) {
        if self.reconnect_exhausted == exhausted {
            return;
        }
        self.reconnect_exhausted = exhausted;
        self.publish(StoreEvent::ReconnectExhaustedChanged { exhausted });
    }

    /// 整体替换患者状态摘要 (后写者胜)。
    pub fn replace_patient_status(&mut self, status: PatientStatusSummary) {
        self.patient_status = Some(status);
        self.publish(StoreEvent::PatientStatusReplaced);
    }

    pub fn append_speech_log(&mut self, entry: SpeechLogEntry) {
        let evicted = self.speech_log.push_newest(entry);
        self.publish(StoreEvent::SpeechLogAppended {
            evicted_oldest: evicted.is_some(),
        });
    }

    /// 追加一条通知，返回其标识。
    pub fn add_notification(&mut self, notification: Notification) -> u64 {
        let id = self.next_notification_id;
        self.next_notification_id += 1;
        self.notifications.push(StoredNotification { id, notification });
        self.publish(StoreEvent::NotificationAdded { id });
        id
    }

    /// 按标识移除通知。通知不存在时返回 `None` 且不发布事件。
    pub fn remove_notification(&mut self, id: u64) -> Option<Notification> {
        let index = self.notification_index(id)?;
        let removed = self.notifications.remove(index);
        self.publish(StoreEvent::NotificationRemoved { id });
        Some(removed.notification)
    }

    pub fn set_emergency(&mut self, record: EmergencyRecord) {
        self.emergency = record.clone();
        self.publish(StoreEvent::EmergencyRecordChanged { record });
    }

    pub fn clear_emergency(&mut self) {
        if self.emergency == EmergencyRecord::default() {
            return;
        }
        self.set_emergency(EmergencyRecord::default());
    }

    /// 仅由紧急状态机调用。
    pub(crate) fn set_emergency_phase(&mut self, to: EmergencyPhase, authority: TransitionAuthority) {
        let from = self.emergency_phase;
        if from == to {
            return;
        }
        self.emergency_phase = to;
        self.publish(StoreEvent::EmergencyPhaseChanged { from, to, authority });
    }

    pub fn navigate(&mut self, view: View) {
        if self.view == view {
            return;
        }
        self.view = view;
        self.publish(StoreEvent::ViewChanged { view });
    }
}
