// PatientTerminal/src/audio.rs

//! 语音播放。
//!
//! 服务器合成语音后推送 `tts_ready`，其中的 `audio_url` 通常是相对路径。这里把它解析为
//! 绝对地址并交给 [`AudioPlayer`]。播放是"发出即忘"的，失败只记录日志。

use std::sync::{Arc, Mutex};

use log::info;
use url::Url;

use crate::error::AppError;

pub trait AudioPlayer: Send {
    fn play(&mut self, url: &Url) -> Result<(), String>;
}

/// 只记录日志的播放器，用于没有音频输出的运行环境。
#[derive(Debug, Default)]
pub struct LogOnlyPlayer;

impl AudioPlayer for LogOnlyPlayer {
    fn play(&mut self, url: &Url) -> Result<(), String> {
        info!("[语音播放] 播放: {}", url);
        Ok(())
    }
}

/// 记录所有播放请求的播放器，克隆体共享同一份记录。用于测试。
#[derive(Debug, Clone, Default)]
pub struct RecordingPlayer {
    played: Arc<Mutex<Vec<String>>>,
}

impl RecordingPlayer {
    pub fn played(&self) -> Vec<String> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl AudioPlayer for RecordingPlayer {
    fn play(&mut self, url: &Url) -> Result<(), String> {
        let mut played = self.played.lock().map_err(|e| e.to_string())?;
        played.push(url.to_string());
        Ok(())
    }
}

/// 以 `base` 为基准解析 `audio_url`。绝对地址原样返回。
pub fn resolve_audio_url(base: &Url, audio_url: &str) -> Result<Url, AppError> {
    base.join(audio_url)
        .map_err(|e| AppError::AudioUrl(format!("'{}': {}", audio_url, e)))
}
