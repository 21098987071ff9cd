// PatientTerminal/src/ws_client/dispatcher.rs

//! 患者端入站消息分发器。

use std::time::Duration;

use common_models::ws_payloads::PatientInbound;
use log::{debug, warn};
use rust_websocket_utils::message::decode_frame;
use url::Url;

use crate::audio::{resolve_audio_url, AudioPlayer};
use crate::candidates;
use crate::emergency::{self, RevertTimer};
use crate::state::{PatientStore, TtsAnnouncement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Candidates { request_id: String },
    Tts { played: bool },
    /// 需要时附带一个待安排的模式恢复定时器。
    EmergencyAck { revert: Option<RevertTimer> },
    ServerError,
    Ignored,
    Dropped,
}

/// 持有分发过程中需要的副作用接口与参数。
pub struct PatientDispatcher {
    audio: Box<dyn AudioPlayer>,
    audio_base: Url,
    revert_delay: Duration,
}

impl PatientDispatcher {
    pub fn new(audio: Box<dyn AudioPlayer>, audio_base: Url, revert_delay: Duration) -> Self {
        Self {
            audio,
            audio_base,
            revert_delay,
        }
    }

    pub fn dispatch_frame(&mut self, text: &str, store: &mut PatientStore) -> Dispatched {
        match decode_frame::<PatientInbound>(text) {
            Ok(message) => self.dispatch(message, store),
            Err(e) => {
                debug!("[患者端分发器] 丢弃无法解码的帧: {} (原始内容: {})", e, text);
                Dispatched::Dropped
            }
        }
    }

    pub fn dispatch(&mut self, message: PatientInbound, store: &mut PatientStore) -> Dispatched {
        debug!("[患者端分发器] 处理消息: {}", message.message_type());
        match message {
            PatientInbound::CandidateUpdate {
                request_id,
                candidate_set,
                is_final,
            } => {
                candidates::on_candidate_update(store, request_id, candidate_set, is_final);
                Dispatched::Candidates {
                    request_id: store.candidates().map(|s| s.request_id.clone()).unwrap_or_default(),
                }
            }
            PatientInbound::TtsReady {
                audio_url,
                text,
                duration_ms,
            } => {
                let resolved = match resolve_audio_url(&self.audio_base, &audio_url) {
                    Ok(url) => url,
                    Err(e) => {
                        warn!("[患者端分发器] {}", e);
                        return Dispatched::Dropped;
                    }
                };
                let played = match self.audio.play(&resolved) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("[患者端分发器] 播放语音失败，已忽略: {}", e);
                        false
                    }
                };
                store.record_tts(TtsAnnouncement {
                    audio_url: resolved.to_string(),
                    text,
                    duration_ms,
                });
                Dispatched::Tts { played }
            }
            PatientInbound::EmergencyAck { notified_caregivers } => Dispatched::EmergencyAck {
                revert: emergency::on_emergency_ack(store, &notified_caregivers, self.revert_delay),
            },
            PatientInbound::Error { detail } => {
                warn!("[患者端分发器] 服务器返回错误: {}", detail);
                store.record_server_error(detail);
                Dispatched::ServerError
            }
            PatientInbound::Unknown => Dispatched::Ignored,
        }
    }
}
