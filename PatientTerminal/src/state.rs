// PatientTerminal/src/state.rs

//! 患者端状态存储。
//!
//! 与护理端相同，`PatientStore` 只由客户端服务的事件循环持有 (单写者)，
//! 每次具名变更都按提交顺序发布一个 [`StoreEvent`]。

use common_models::enums::TransitionAuthority;
use common_models::history::BoundedLog;
use common_models::patient::{Candidate, MAX_CANDIDATES, NO_GAZE_ZONE};
use log::{debug, warn};
use rust_websocket_utils::client::ConnectionState;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::event::StoreEvent;

/// 患者端的输入模式。
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// 候选短语选择 (常规模式)。
    #[default]
    Candidate,
    Hiragana,
    Emergency,
    Calibration,
}

/// 候选状态机的阶段，由是否持有候选集合推导。
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CandidatePhase {
    WaitingForCandidates,
    CandidatesPresented,
}

/// 当前呈现的候选集合。
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CandidateSet {
    pub request_id: String,
    pub candidates: Vec<Candidate>,
    pub stage: u8,
    pub is_final: bool,
}

/// 会话历史中的一条发话。
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub text: String,
    pub timestamp_ms: i64,
    pub was_spoken: bool,
}

/// 最近一次 `tts_ready` 的内容，`audio_url` 已解析为绝对地址。
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TtsAnnouncement {
    pub audio_url: String,
    pub text: String,
    pub duration_ms: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PatientSnapshot {
    pub connection_state: ConnectionState,
    /// 重试已用尽，需要手动重连。
    pub reconnect_exhausted: bool,
    pub input_mode: InputMode,
    pub gaze_zone: i32,
    pub candidate_phase: CandidatePhase,
    pub candidates: Option<CandidateSet>,
    /// 最新在前。
    pub history: Vec<HistoryEntry>,
    pub last_tts: Option<TtsAnnouncement>,
    pub last_server_error: Option<String>,
}

pub struct PatientStore {
    connection_state: ConnectionState,
    reconnect_exhausted: bool,
    input_mode: InputMode,
    // 每次输入模式变化时递增，用于识别过期的模式恢复定时器
    mode_epoch: u64,
    gaze_zone: i32,
    candidates: Option<CandidateSet>,
    history: BoundedLog<HistoryEntry>,
    last_tts: Option<TtsAnnouncement>,
    last_server_error: Option<String>,
    subscribers: Vec<mpsc::UnboundedSender<StoreEvent>>,
}

impl PatientStore {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            connection_state: ConnectionState::Idle,
            reconnect_exhausted: false,
            input_mode: InputMode::Candidate,
            mode_epoch: 0,
            gaze_zone: NO_GAZE_ZONE,
            candidates: None,
            history: BoundedLog::with_capacity(history_capacity),
            last_tts: None,
            last_server_error: None,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StoreEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, event: StoreEvent) {
        debug!("[患者端状态] 提交变更 {}: {:?}", event.event_name(), event);
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn reconnect_exhausted(&self) -> bool {
        self.reconnect_exhausted
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn mode_epoch(&self) -> u64 {
        self.mode_epoch
    }

    pub fn gaze_zone(&self) -> i32 {
        self.gaze_zone
    }

    pub fn candidates(&self) -> Option<&CandidateSet> {
        self.candidates.as_ref()
    }

    pub fn candidate_phase(&self) -> CandidatePhase {
        match self.candidates {
            Some(_) => CandidatePhase::CandidatesPresented,
            None => CandidatePhase::WaitingForCandidates,
        }
    }

    pub fn history(&self) -> &BoundedLog<HistoryEntry> {
        &self.history
    }

    pub fn last_tts(&self) -> Option<&TtsAnnouncement> {
        self.last_tts.as_ref()
    }

    pub fn last_server_error(&self) -> Option<&str> {
        self.last_server_error.as_deref()
    }

    pub fn snapshot(&self) -> PatientSnapshot {
        PatientSnapshot {
            connection_state: self.connection_state,
            reconnect_exhausted: self.reconnect_exhausted,
            input_mode: self.input_mode,
            gaze_zone: self.gaze_zone,
            candidate_phase: self.candidate_phase(),
            candidates: self.candidates.clone(),
            history: self.history.to_vec_newest_first(),
            last_tts: self.last_tts.clone(),
            last_server_error: self.last_server_error.clone(),
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

    /// 标记有限重试策略是否已用尽。
    pub fn set_reconnect_exhausted(&mut self, exhausted: bool) {
        if self.reconnect_exhausted == exhausted {
            return;
        }
        self.reconnect_exhausted = exhausted;
        self.publish(StoreEvent::ReconnectExhaustedChanged { exhausted });
    }

    /// 切换输入模式并递增模式纪元。模式不变时什么也不做。
    pub fn set_input_mode(&mut self, to: InputMode, authority: TransitionAuthority) -> bool {
        let from = self.input_mode;
        if from == to {
            return false;
        }
        self.input_mode = to;
        self.mode_epoch += 1;
        self.publish(StoreEvent::InputModeChanged { from, to, authority });
        true
    }

    /// 记录当前注视的区域，`-1` 表示没有注视任何区域。
    pub fn set_gaze_zone(&mut self, zone: i32) {
        if self.gaze_zone == zone {
            return;
        }
        self.gaze_zone = zone;
        self.publish(StoreEvent::GazeZoneChanged { zone });
    }

    /// 整体替换候选集合。超过上限的候选被截断。
    pub fn replace_candidates(&mut self, mut set: CandidateSet) {
        if set.candidates.len() > MAX_CANDIDATES {
            warn!(
                "[患者端状态] 候选集合 {} 包含 {} 个候选，只保留前 {} 个",
                set.request_id,
                set.candidates.len(),
                MAX_CANDIDATES
            );
            set.candidates.truncate(MAX_CANDIDATES);
        }
        let event = StoreEvent::CandidatesReplaced {
            request_id: set.request_id.clone(),
            count: set.candidates.len(),
            is_final: set.is_final,
        };
        self.candidates = Some(set);
        self.publish(event);
    }

    /// 清空候选集合，返回被清空的集合。
    pub fn clear_candidates(&mut self) -> Option<CandidateSet> {
        let cleared = self.candidates.take()?;
        self.publish(StoreEvent::CandidatesCleared {
            request_id: cleared.request_id.clone(),
        });
        Some(cleared)
    }

    pub fn append_history(&mut self, entry: HistoryEntry) {
        let evicted = self.history.push_newest(entry);
        self.publish(StoreEvent::HistoryAppended {
            evicted_oldest: evicted.is_some(),
        });
    }

    pub fn record_tts(&mut self, announcement: TtsAnnouncement) {
        let text = announcement.text.clone();
        self.last_tts = Some(announcement);
        self.publish(StoreEvent::TtsAnnounced { text });
    }

    pub fn record_server_error(&mut self, detail: String) {
        self.last_server_error = Some(detail.clone());
        self.publish(StoreEvent::ServerErrorRecorded { detail });
    }
}
