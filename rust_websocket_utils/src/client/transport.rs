// rust_websocket_utils/src/client/transport.rs

//! 客户端 WebSocket 传输层。
//!
//! 负责建立到后端的 WebSocket 连接、发送文本帧以及从连接中读取文本帧。
//! 连接的生命周期 (重连、代际令牌) 由 `connection_manager` 与 `driver` 模块管理，
//! 这里只处理单个连接上的 I/O。

use common_models::enums::ClientRole;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use log::{debug, error, info};
use tokio_tungstenite::{
    WebSocketStream, connect_async,
    tungstenite::Error as TungsteniteError,
    tungstenite::protocol::Message,
};
use url::Url;

use crate::error::WsError;

/// 客户端 WebSocket 流的类型别名。
pub type ClientWsStream = WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// 一个已建立的客户端连接，拆分为发送端与接收端。
pub struct ClientConnection {
    pub ws_sender: SplitSink<ClientWsStream, Message>,
    pub ws_receiver: SplitStream<ClientWsStream>,
}

impl ClientConnection {
    /// 发送一个文本帧。
    pub async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        debug!("客户端：准备发送文本帧: {}", text);
        self.ws_sender.send(Message::Text(text)).await?;
        Ok(())
    }

    /// 发送 Close 帧并关闭发送端。
    pub async fn close(&mut self) -> Result<(), WsError> {
        self.ws_sender.close().await?;
        Ok(())
    }
}

/// 根据后端基础地址与客户端角色，拼接并校验 WebSocket 端点 URL。
///
/// # Errors
/// 当地址无法解析，或协议不是 `ws` / `wss` 时返回 `WsError::InvalidUrl`。
pub fn role_endpoint(base_url: &str, role: ClientRole) -> Result<Url, WsError> {
    let joined = role.endpoint_url(base_url);
    let url = Url::parse(&joined)
        .map_err(|e| WsError::InvalidUrl(format!("无效的 WebSocket URL '{}': {}", joined, e)))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(WsError::InvalidUrl(format!(
            "WebSocket URL '{}' 的协议必须是 ws 或 wss，实际为 '{}'",
            joined, other
        ))),
    }
}

/// 连接到指定的 WebSocket 服务器。
pub async fn connect_client(url_str: &str) -> Result<ClientConnection, WsError> {
    info!("客户端：开始尝试连接到 WebSocket 服务器，URL: {}", url_str);
    let parsed_url = Url::parse(url_str)
        .map_err(|e| WsError::InvalidUrl(format!("无效的 WebSocket URL '{}': {}", url_str, e)))?;

    match connect_async(parsed_url.as_str()).await {
        Ok((ws_stream, response)) => {
            info!("客户端：已成功连接到 {} (HTTP 状态码: {})", url_str, response.status());
            let (ws_sender, ws_receiver) = ws_stream.split();
            Ok(ClientConnection { ws_sender, ws_receiver })
        }
        Err(e) => {
            error!("客户端：连接到 {} 失败，错误: {}", url_str, e);
            Err(WsError::WebSocketProtocolError(e))
        }
    }
}

/// 从接收端读取下一个文本帧。
///
/// - `Some(Ok(text))`: 收到一个文本帧。
/// - `Some(Err(e))`: 传输层出错，连接应视为已失效。
/// - `None`: 连接已正常关闭。
///
/// Ping/Pong 等控制帧与二进制帧会被跳过 (协议只使用文本帧)。
pub async fn receive_text(ws_receiver: &mut SplitStream<ClientWsStream>) -> Option<Result<String, WsError>> {
    loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                debug!("客户端：收到原始文本帧: '{}'", text);
                break Some(Ok(text));
            }
            Some(Ok(Message::Binary(bin))) => {
                debug!("客户端：收到非预期的二进制帧 ({} 字节)，已忽略。", bin.len());
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
            Some(Ok(Message::Close(close_frame))) => {
                debug!("客户端：收到 Close 控制帧: {:?}", close_frame);
                break None;
            }
            Some(Err(TungsteniteError::ConnectionClosed)) | Some(Err(TungsteniteError::AlreadyClosed)) => {
                debug!("客户端：连接已关闭。");
                break None;
            }
            Some(Err(e)) => {
                error!("客户端：从 WebSocket 流接收消息时发生底层错误: {}", e);
                break Some(Err(WsError::WebSocketProtocolError(e)));
            }
            None => {
                debug!("客户端：WebSocket 接收流已结束。");
                break None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::transport::{ServerTransport, WsStream};
    use std::net::SocketAddr;
    use tokio::time::{Duration, timeout};

    #[test]
    fn test_role_endpoint() {
        let url = role_endpoint("ws://127.0.0.1:8765/", ClientRole::Patient).unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:8765/ws/patient");
        assert!(matches!(
            role_endpoint("http://127.0.0.1:8765", ClientRole::Caregiver),
            Err(WsError::InvalidUrl(_))
        ));
        assert!(role_endpoint("not a url", ClientRole::Caregiver).is_err());
    }

    #[tokio::test]
    async fn test_client_send_and_receive_text() {
        let _ = env_logger::builder().is_test(true).try_init();

        let server = ServerTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr();
        let server_handle = tokio::spawn(server.serve(|mut ws: WsStream, _peer: SocketAddr| async move {
            // 回显第一条文本帧
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = ws.send(Message::Text(format!("echo:{}", text))).await;
            }
        }));

        let mut conn = connect_client(&format!("ws://{}", addr)).await.unwrap();
        conn.send_text(r#"{"type":"gaze_update"}"#.to_string()).await.unwrap();
        let received = timeout(Duration::from_secs(5), receive_text(&mut conn.ws_receiver))
            .await
            .expect("等待回显超时");
        match received {
            Some(Ok(text)) => assert_eq!(text, r#"echo:{"type":"gaze_update"}"#),
            other => panic!("期望收到回显文本帧，实际为 {:?}", other.map(|r| r.map_err(|e| e.to_string()))),
        }
        server_handle.abort();
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let result = connect_client(&format!("ws://{}", addr)).await;
        assert!(matches!(result, Err(WsError::WebSocketProtocolError(_))));
    }
}
