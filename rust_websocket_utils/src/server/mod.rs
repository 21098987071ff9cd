// rust_websocket_utils/src/server/mod.rs

//! WebSocket 服务端模块。
//!
//! 两个客户端的后端不在本仓库中实现；这里的服务端传输层用于在测试中
//! 启动一个真实的本地 WebSocket 后端。

pub mod transport;
