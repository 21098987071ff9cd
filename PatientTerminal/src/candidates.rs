// PatientTerminal/src/candidates.rs

//! 候选状态机: `WaitingForCandidates → CandidatesPresented → 选择 → WaitingForCandidates`。
//!
//! 选择是乐观的：发送 `candidate_selected` 后立即把所选文本写入会话历史并清空候选集合，
//! 不等待服务器回复。连接不可用时消息被丢弃，但本地状态照常推进。

use chrono::Utc;
use common_models::patient::CandidateSetPayload;
use common_models::ws_payloads::PatientOutbound;
use log::{debug, info, warn};
use rust_websocket_utils::client::{FrameSender, SendOutcome};
use rust_websocket_utils::message::encode_frame;

use crate::state::{CandidateSet, HistoryEntry, PatientStore};

/// 一次选择的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected {
        request_id: String,
        index: usize,
        text: String,
        send: SendOutcome,
    },
    /// 当前没有候选集合。
    NoCandidates,
    /// 下标超出当前候选数量，或没有注视任何候选。
    OutOfRange,
}

/// 收到 `candidate_update`：以新的集合整体替换当前集合。
///
/// 请求标识取消息顶层的 `request_id`，为空时退回到 `candidate_set.request_id`。
/// 空的候选列表等同于清空，状态机回到 `WaitingForCandidates`。
pub fn on_candidate_update(store: &mut PatientStore, request_id: String, payload: CandidateSetPayload, is_final: bool) {
    let request_id = if request_id.is_empty() {
        payload.request_id
    } else {
        request_id
    };
    if payload.candidates.is_empty() {
        debug!("[候选状态机] 请求 {} 的候选列表为空，清空当前集合", request_id);
        store.clear_candidates();
        return;
    }
    store.replace_candidates(CandidateSet {
        request_id,
        candidates: payload.candidates,
        stage: payload.stage,
        is_final: is_final || payload.is_final,
    });
}

/// 选择下标为 `index` 的候选。
pub fn select(store: &mut PatientStore, sender: &mut dyn FrameSender, index: usize) -> SelectOutcome {
    let Some(set) = store.candidates() else {
        return SelectOutcome::NoCandidates;
    };
    if set.request_id.is_empty() {
        warn!("[候选状态机] 当前候选集合缺少请求标识，忽略选择");
        return SelectOutcome::NoCandidates;
    }
    let Some(candidate) = set.candidates.get(index) else {
        return SelectOutcome::OutOfRange;
    };
    let request_id = set.request_id.clone();
    let text = candidate.text.clone();

    let send = match encode_frame(&PatientOutbound::CandidateSelected {
        request_id: request_id.clone(),
        candidate_index: index,
    }) {
        Ok(frame) => sender.send_text(frame),
        Err(e) => {
            warn!("[候选状态机] 编码选择消息失败: {}", e);
            SendOutcome::Dropped
        }
    };
    info!("[候选状态机] 选择候选 {} / {}: {}", request_id, index, text);

    store.append_history(HistoryEntry {
        text: text.clone(),
        timestamp_ms: Utc::now().timestamp_millis(),
        was_spoken: true,
    });
    store.clear_candidates();
    SelectOutcome::Selected {
        request_id,
        index,
        text,
        send,
    }
}

/// 确认当前注视区域对应的候选。
pub fn confirm_gazed(store: &mut PatientStore, sender: &mut dyn FrameSender) -> SelectOutcome {
    match usize::try_from(store.gaze_zone()) {
        Ok(index) => select(store, sender, index),
        Err(_) => SelectOutcome::OutOfRange,
    }
}
