// CaregiverConsole/src/ws_client/mod.rs

//! 护理端 WebSocket 客户端：入站消息分发器与拥有状态存储的客户端服务。

pub mod dispatcher;
pub mod service;

pub use service::{spawn, CaregiverCommand, CaregiverHandle};
