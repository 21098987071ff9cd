use std::path::PathBuf;

use anyhow::Result;
use log::info;
use patient_terminal::audio::LogOnlyPlayer;
use patient_terminal::config::{bootstrap_log_level, default_config_path, init_app_config, load_app_config};
use patient_terminal::ws_client;

/// `PatientTerminal` (患者端) 的主入口点。
///
/// 第一个命令行参数可指定配置文件路径；`RUST_LOG` 优先于配置中的日志级别。
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

    info!("患者端应用 (PatientTerminal) 正在启动，配置文件: {}", config_path.display());
    let (handle, task) = ws_client::spawn(&config, Box::new(LogOnlyPlayer))?;

    tokio::signal::ctrl_c().await?;
    info!("[患者端] 收到退出信号，正在关闭...");
    handle.shutdown().await?;
    task.await?;
    info!("患者端应用已退出。");
    Ok(())
}
