// CaregiverConsole/src/error.rs

//! 护理端应用级错误类型。
//!
//! 连接层的错误 (`WsError`) 不会出现在这里：传输失败交给重连策略处理，
//! 解码失败由分发器记录后丢弃。这里只描述配置与客户端服务生命周期上的失败。

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

    /// 客户端服务的事件循环已经退出，请求无法再被处理。
    #[error("护理端客户端服务已停止")]
    ServiceStopped,
}
