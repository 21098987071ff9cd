// rust_websocket_utils/src/client/mod.rs

//! WebSocket 客户端模块。
//!
//! - `transport`: 单个连接上的 I/O (连接、发送、接收文本帧)。
//! - `reconnect`: 重连退避策略。
//! - `connection_manager`: 不做 I/O 的连接生命周期状态机，使用代际令牌过滤过期事件。
//! - `driver`: 为每个代际启动套接字任务与重连定时器任务的异步驱动器。

pub mod connection_manager;
pub mod driver;
pub mod reconnect;
pub mod transport;

pub use connection_manager::{ConnectionManager, ConnectionState, Generation, ReconnectTimer};
pub use driver::{ConnectionDriver, ConnectionEvent, DriverOutput, FrameSender, RecordingSender, SendOutcome};
pub use reconnect::{ReconnectPolicy, ReconnectSettings};
