// rust_websocket_utils/src/error.rs

//! 定义 WebSocket 工具库相关的错误类型。

use thiserror::Error;

/// WebSocket 工具库的统一错误类型。
///
/// 这些错误都不会向应用层"致命"地传播：传输类错误交给重连策略处理，
/// 编解码类错误由分发器记录后丢弃对应的帧。
#[derive(Error, Debug)]
pub enum WsError {
    /// 当 serde 序列化失败时返回。
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 当收到的帧不是合法的 JSON，或缺少 `type` 判别字段时返回。
    #[error("反序列化错误: {0}")]
    DeserializationError(String),

    /// WebSocket 协议相关的错误，例如握手失败、连接被重置。
    #[error("WebSocket协议错误: {0}")]
    WebSocketProtocolError(#[from] tokio_tungstenite::tungstenite::Error),

    /// 底层 I/O 错误。
    #[error("I/O错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 无效的 URL 格式。
    #[error("无效的URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_readable() {
        assert_eq!(WsError::DeserializationError("x".to_string()).to_string(), "反序列化错误: x");
        let err = WsError::InvalidUrl("http://x".to_string());
        assert!(err.to_string().contains("http://x"));
        let io: WsError = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into();
        assert!(matches!(io, WsError::IoError(_)));
    }
}
