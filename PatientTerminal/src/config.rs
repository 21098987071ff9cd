// PatientTerminal/src/config.rs

//! 患者端 (`PatientTerminal`) 应用配置管理模块。
//!
//! 配置文件默认位于工作目录下的 `config/patient_config.json`。文件不存在时写入默认配置；
//! 内容损坏时 `init_app_config` 记录错误并回退到默认配置，因此它应在日志初始化之后调用。

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use common_models::enums::ClientRole;
use log::{error, info};
use rust_websocket_utils::client::transport::role_endpoint;
use rust_websocket_utils::client::{ReconnectPolicy, ReconnectSettings};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;

pub const CONFIG_DIR: &str = "config";
pub const CONFIG_FILE_NAME: &str = "patient_config.json";

/// 患者端应用配置。字段缺失时取默认值。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// 后端 WebSocket 服务的基础地址，实际连接 `<backend_ws_url>/ws/patient`。
    pub backend_ws_url: String,

    /// 日志级别，环境变量 `RUST_LOG` 优先。
    pub log_level: String,

    /// 重连参数。默认固定 3 秒间隔，最多 10 次。
    pub reconnect: ReconnectSettings,

    /// 收到 `emergency_ack` 后多久退出紧急模式 (毫秒)。
    pub emergency_revert_ms: u64,

    /// 本地会话历史保留的条数。
    pub conversation_history_capacity: usize,

    /// `tts_ready.audio_url` 的解析基准地址。
    pub audio_base_url: String,

    pub auto_connect: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_ws_url: "ws://127.0.0.1:8765".to_string(),
            log_level: "info".to_string(),
            reconnect: ReconnectSettings::from(&ReconnectPolicy::patient()),
            emergency_revert_ms: 5000,
            conversation_history_capacity: 50,
            audio_base_url: "http://127.0.0.1:8765".to_string(),
            auto_connect: true,
        }
    }
}

impl AppConfig {
    /// 患者端 WebSocket 端点的完整 URL。
    pub fn endpoint_url(&self) -> Result<String, AppError> {
        Ok(role_endpoint(&self.backend_ws_url, ClientRole::Patient)?.to_string())
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        self.reconnect.to_policy()
    }

    pub fn emergency_revert_delay(&self) -> Duration {
        Duration::from_millis(self.emergency_revert_ms)
    }

    pub fn audio_base(&self) -> Result<Url, AppError> {
        Url::parse(&self.audio_base_url)
            .map_err(|e| AppError::Config(format!("audio_base_url '{}' 无效: {}", self.audio_base_url, e)))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join(CONFIG_FILE_NAME)
}

/// 从指定路径加载配置。文件不存在时创建默认配置并保存。
pub fn load_app_config(config_path: &Path) -> Result<AppConfig> {
    if !config_path.exists() {
        info!(
            "[配置模块] 配置文件 '{}' 未找到，将使用默认配置参数创建新文件。",
            config_path.display()
        );
        let default_config = AppConfig::default();
        save_app_config(config_path, &default_config)?;
        return Ok(default_config);
    }
    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("读取配置文件 '{}' 失败", config_path.display()))?;
    serde_json::from_str(&config_content)
        .with_context(|| format!("解析配置文件 '{}' 的内容失败", config_path.display()))
}

pub fn save_app_config(config_path: &Path, app_config: &AppConfig) -> Result<()> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.as_os_str().is_empty() {
            fs::create_dir_all(parent_dir)
                .with_context(|| format!("创建配置目录 '{}' 失败", parent_dir.display()))?;
        }
    }
    let config_content =
        serde_json::to_string_pretty(app_config).context("序列化应用配置到 JSON 字符串失败")?;
    fs::write(config_path, config_content)
        .with_context(|| format!("写入配置文件 '{}' 失败", config_path.display()))?;
    info!("[配置模块] 应用配置已保存至: '{}'", config_path.display());
    Ok(())
}

/// 日志初始化使用的级别。加载失败时使用默认配置的级别。
pub fn bootstrap_log_level(loaded: &Result<AppConfig>) -> String {
    match loaded {
        Ok(config) => config.log_level.clone(),
        Err(_) => AppConfig::default().log_level,
    }
}

/// 根据加载结果初始化应用配置。加载失败时记录错误并使用默认配置。
pub fn init_app_config(config_path: &Path, loaded: Result<AppConfig>) -> AppConfig {
    loaded.unwrap_or_else(|e| {
        error!(
            "[配置模块] 从文件 {} 加载配置失败: {:#}。将使用默认配置。",
            config_path.display(),
            e
        );
        AppConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestCleanup {
        dir: PathBuf,
    }

    impl Drop for TestCleanup {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn test_missing_file_writes_patient_defaults() {
        let dir = std::env::temp_dir().join(format!("patient_config_test_{}", uuid::Uuid::new_v4()));
        let _cleanup = TestCleanup { dir: dir.clone() };
        let path = dir.join(CONFIG_FILE_NAME);

        let config = load_app_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::patient());
        assert_eq!(config.emergency_revert_delay(), Duration::from_secs(5));
        assert_eq!(config.conversation_history_capacity, 50);
        assert_eq!(config.endpoint_url().unwrap(), "ws://127.0.0.1:8765/ws/patient");

        fs::write(&path, "{").unwrap();
        let loaded = load_app_config(&path);
        assert!(loaded.is_err());
        assert_eq!(bootstrap_log_level(&loaded), AppConfig::default().log_level);
        assert_eq!(init_app_config(&path, loaded), AppConfig::default());
    }

    #[test]
    fn test_invalid_audio_base_is_a_config_error() {
        let config = AppConfig {
            audio_base_url: "not a url".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.audio_base(), Err(AppError::Config(_))));
        assert_eq!(AppConfig::default().audio_base().unwrap().as_str(), "http://127.0.0.1:8765/");
    }
}
