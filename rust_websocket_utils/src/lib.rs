//! `rust_websocket_utils` 是 VoiceReach 两个客户端共用的 WebSocket 通信工具库。
//!
//! 主要模块包括：
//! - `error`: 库内统一的错误类型 `WsError`。
//! - `message`: 单帧 JSON 编解码 (`encode_frame` / `decode_frame`)。
//! - `client`: 客户端传输层、重连策略、带代际令牌的连接管理器以及异步连接驱动器。
//! - `server`: 服务端传输层，供本地测试后端使用。

pub mod client;
pub mod error;
pub mod message;
pub mod server;
