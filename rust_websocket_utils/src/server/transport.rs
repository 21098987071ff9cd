// rust_websocket_utils/src/server/transport.rs

//! 包含服务端 WebSocket 监听、接受连接的逻辑。

use std::future::Future;
use std::net::SocketAddr;

use log::{error, info};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{WebSocketStream, accept_async};

use crate::error::WsError;

/// `WsStream` 是一个类型别名，代表经过 WebSocket 握手后的 TCP 流。
pub type WsStream = WebSocketStream<TcpStream>;

/// `ServerTransport` 负责绑定监听地址。
pub struct ServerTransport;

/// 已绑定但尚未开始接受连接的服务器。
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ServerTransport {
    /// 绑定到指定地址。传入 `"127.0.0.1:0"` 时由系统分配端口，可通过 [`BoundServer::local_addr`] 查询。
    pub async fn bind(addr: &str) -> Result<BoundServer, WsError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("WebSocket 服务器正在监听地址: {}", local_addr);
        Ok(BoundServer { listener, local_addr })
    }
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 持续接受连接。每个握手成功的连接都会在独立的 Tokio 任务中调用 `on_connect`。
    ///
    /// 此函数不会主动返回，应在独立任务中运行并在不再需要时 `abort`。
    pub async fn serve<F, Fut>(self, on_connect: F) -> Result<(), WsError>
    where
        F: Fn(WsStream, SocketAddr) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        loop {
            match self.listener.accept().await {
                Ok((tcp_stream, peer_addr)) => {
                    info!("从 {} 接受了新的 TCP 连接", peer_addr);
                    let on_connect_callback = on_connect.clone();
                    tokio::spawn(async move {
                        match accept_async(tcp_stream).await {
                            Ok(ws_stream) => {
                                info!("与 {} 的 WebSocket 握手成功", peer_addr);
                                on_connect_callback(ws_stream, peer_addr).await;
                            }
                            Err(e) => {
                                error!("与 {} 的 WebSocket 握手失败: {}", peer_addr, e);
                            }
                        }
                    });
                }
                Err(e) => {
                    // 接受失败不影响后续连接
                    error!("接受 TCP 连接失败: {}。服务器将继续运行。", e);
                }
            }
        }
    }
}
