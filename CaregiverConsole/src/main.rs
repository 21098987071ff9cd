// --- 依赖引入 ---
use std::path::PathBuf;

use anyhow::Result;
use caregiver_console::config::{bootstrap_log_level, default_config_path, init_app_config, load_app_config};
use caregiver_console::notification::LogOnlyPlatform;
use caregiver_console::ws_client;
use log::info;

/// `CaregiverConsole` (护理端) 的主入口点。
///
/// 1. 加载配置 (第一个命令行参数可指定配置文件路径)。
/// 2. 按配置中的级别初始化 `env_logger`，`RUST_LOG` 优先；加载失败时先以默认级别初始化，再记录错误。
/// 3. 启动客户端服务，等待 Ctrl+C 后关闭。
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let loaded = load_app_config(&config_path);

    env_logger::Builder::new()
        .parse_filters(&bootstrap_log_level(&loaded))
        .parse_env("RUST_LOG")
        .try_init()?;
    let config = init_app_config(&config_path, loaded);

    info!("护理端应用 (CaregiverConsole) 正在启动，配置文件: {}", config_path.display());
    let (handle, task) = ws_client::spawn(&config, Box::new(LogOnlyPlatform))?;

    tokio::signal::ctrl_c().await?;
    info!("[护理端] 收到退出信号，正在关闭...");
    handle.shutdown().await?;
    task.await?;
    info!("护理端应用已退出。");
    Ok(())
}
