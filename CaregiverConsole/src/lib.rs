//! `CaregiverConsole` 护理端客户端库。
//!
//! 护理端通过 `/ws/caregiver` 与后端保持一条 WebSocket 连接，接收患者状态、发话日志与通知，
//! 在收到紧急通知时进入紧急状态机，并把通知投递给操作系统。

pub mod config;         // 配置加载与保存
pub mod emergency;      // 紧急状态机
pub mod error;          // 应用级错误类型
pub mod event;          // 状态存储发布的变更事件
pub mod notification;   // 系统通知与升级
pub mod state;          // 单写者状态存储
pub mod ws_client;      // 分发器与客户端服务
