// CaregiverConsole/src/config.rs

//! 护理端 (`CaregiverConsole`) 应用配置管理模块。
//!
//! 本模块定义应用所需的配置参数 (`AppConfig`)，并提供从 JSON 文件加载、保存配置的功能。
//! 配置文件默认位于工作目录下的 `config/caregiver_config.json`。
//!
//! - 文件不存在时，生成默认配置并写回文件，便于用户在此基础上修改。
//! - 文件存在但内容损坏时，`load_app_config` 返回错误；`init_app_config` 记录错误后回退到默认配置。
//!   `init_app_config` 应在日志初始化之后调用，日志级别先由 [`bootstrap_log_level`] 决定。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use common_models::enums::ClientRole;
use log::{error, info};
use rust_websocket_utils::client::transport::role_endpoint;
use rust_websocket_utils::client::{ReconnectPolicy, ReconnectSettings};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 配置文件所在目录 (相对于工作目录)。
pub const CONFIG_DIR: &str = "config";
/// 配置文件名。
pub const CONFIG_FILE_NAME: &str = "caregiver_config.json";

/// 护理端应用配置，对应配置文件的内容。
///
/// 字段缺失时取默认值，因此旧版本的配置文件在新增字段后仍然可以加载。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// 后端 WebSocket 服务的基础地址，不含角色路径。
    /// 例如: `"ws://127.0.0.1:8765"`，实际连接 `"ws://127.0.0.1:8765/ws/caregiver"`。
    pub backend_ws_url: String,

    /// 日志级别: `"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`。
    /// 环境变量 `RUST_LOG` 优先于此设置。
    pub log_level: String,

    /// 重连退避参数。默认 1 秒起步、每次翻倍、上限 16 秒、无限重试。
    pub reconnect: ReconnectSettings,

    /// 是否投递系统通知。关闭后通知只写入状态存储。
    pub notifications_enabled: bool,

    /// 启动时是否自动连接后端。
    pub auto_connect: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_ws_url: "ws://127.0.0.1:8765".to_string(),
            log_level: "info".to_string(),
            reconnect: ReconnectSettings::from(&ReconnectPolicy::caregiver()),
            notifications_enabled: true,
            auto_connect: true,
        }
    }
}

impl AppConfig {
    /// 护理端 WebSocket 端点的完整 URL。
    pub fn endpoint_url(&self) -> Result<String, AppError> {
        Ok(role_endpoint(&self.backend_ws_url, ClientRole::Caregiver)?.to_string())
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        self.reconnect.to_policy()
    }
}

/// 默认的配置文件路径: `config/caregiver_config.json`。
pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join(CONFIG_FILE_NAME)
}

/// 从指定路径加载配置。文件不存在时创建默认配置并保存。
pub fn load_app_config(config_path: &Path) -> Result<AppConfig> {
    if config_path.exists() {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("读取配置文件 '{}' 失败", config_path.display()))?;
        let app_config: AppConfig = serde_json::from_str(&config_content)
            .with_context(|| format!("解析配置文件 '{}' 的内容失败", config_path.display()))?;
        Ok(app_config)
    } else {
        info!(
            "[配置模块] 配置文件 '{}' 未找到，将使用默认配置参数创建新文件。",
            config_path.display()
        );
        let default_config = AppConfig::default();
        save_app_config(config_path, &default_config)?;
        Ok(default_config)
    }
}

/// 将配置以格式化 JSON 写入指定路径，必要时创建父目录。
pub fn save_app_config(config_path: &Path, app_config: &AppConfig) -> Result<()> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            fs::create_dir_all(parent_dir)
                .with_context(|| format!("创建配置目录 '{}' 失败", parent_dir.display()))?;
        }
    }

    let config_content =
        serde_json::to_string_pretty(app_config).context("序列化应用配置到 JSON 字符串失败")?;
    fs::write(config_path, config_content)
        .with_context(|| format!("写入配置文件 '{}' 失败", config_path.display()))?;

    info!("[配置模块] 应用配置已成功保存至: '{}'", config_path.display());
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
    match loaded {
        Ok(config) => {
            info!("[配置模块] 应用配置已成功初始化完毕 (从 {} 加载)。", config_path.display());
            config
        }
        Err(e) => {
            error!(
                "[配置模块] 从文件 {} 加载配置失败: {:#}。将使用默认配置。",
                config_path.display(),
                e
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试结束时删除临时目录。
    struct TestCleanup {
        dir: PathBuf,
    }

    impl Drop for TestCleanup {
        fn drop(&mut self) {
            if self.dir.exists() {
                if let Err(e) = fs::remove_dir_all(&self.dir) {
                    eprintln!("警告：测试后清理目录 '{}' 失败: {}", self.dir.display(), e);
                }
            }
        }
    }

    fn temp_config_path() -> (PathBuf, TestCleanup) {
        let dir = std::env::temp_dir().join(format!("caregiver_config_test_{}", uuid::Uuid::new_v4()));
        let path = dir.join(CONFIG_DIR).join(CONFIG_FILE_NAME);
        (path, TestCleanup { dir })
    }

    #[test]
    fn test_load_and_save_config() {
        let (config_path, _cleanup) = temp_config_path();

        // 场景 1: 文件不存在时创建默认配置
        let loaded = load_app_config(&config_path).expect("加载默认配置失败");
        assert_eq!(loaded, AppConfig::default());
        assert!(config_path.exists(), "默认配置文件应当被创建");

        // 场景 2: 修改后保存并重新加载
        let mut modified = loaded.clone();
        modified.backend_ws_url = "ws://10.0.0.5:9000".to_string();
        modified.notifications_enabled = false;
        modified.reconnect.max_attempts = Some(3);
        save_app_config(&config_path, &modified).expect("保存配置失败");
        let reloaded = load_app_config(&config_path).expect("重新加载配置失败");
        assert_eq!(reloaded, modified);
        assert_eq!(reloaded.endpoint_url().unwrap(), "ws://10.0.0.5:9000/ws/caregiver");

        // 场景 3: 文件损坏时返回解析错误，init 回退到默认值
        fs::write(&config_path, "这不是一个有效的JSON字符串").unwrap();
        let err = load_app_config(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("解析配置文件"));
        let loaded = load_app_config(&config_path);
        assert_eq!(bootstrap_log_level(&loaded), "info");
        assert_eq!(init_app_config(&config_path, loaded), AppConfig::default());
    }

    #[test]
    fn test_partial_config_takes_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"log_level":"debug"}"#).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(bootstrap_log_level(&Ok(config.clone())), "debug");
        assert_eq!(config.backend_ws_url, "ws://127.0.0.1:8765");
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::caregiver());
    }

    #[test]
    fn test_invalid_backend_url_is_rejected() {
        let config = AppConfig {
            backend_ws_url: "http://127.0.0.1:8765".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.endpoint_url(), Err(AppError::WebSocketService(_))));
    }
}
