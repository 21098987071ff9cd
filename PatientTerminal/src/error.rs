// PatientTerminal/src/error.rs

//! 患者端应用级错误类型。

use rust_websocket_utils::error::WsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// 配置文件无法读取、解析或保存，或配置值无效。
    #[error("配置错误: {0}")]
    Config(String),

    /// 构建 WebSocket 端点等连接相关操作失败。
    #[error("WebSocket 服务错误: {0}")]
    WebSocketService(#[from] WsError),

    /// 语音文件地址无法解析。
    #[error("语音文件地址无效: {0}")]
    AudioUrl(String),

    /// 客户端服务的事件循环已经退出，请求无法再被处理。
    #[error("患者端客户端服务已停止")]
    ServiceStopped,
}
