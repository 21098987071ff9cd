//! `common_models` 公共模型库 crate。
//!
//! 本 crate 集中定义了 VoiceReach 实时连接层的两个客户端 (护理端 `CaregiverConsole`、
//! 患者端 `PatientTerminal`) 与后端服务之间共享的数据结构和枚举类型。
//!
//! 主要包含以下模型：
//! - **通用枚举 (`enums`)**: 客户端角色、通知级别、IAL 事件取值、状态迁移的权威来源。
//! - **护理端实体 (`caregiver`)**: 患者状态摘要、发话记录、通知。
//! - **患者端实体 (`patient`)**: 候选短语、候选集合、IAL 事件、紧急类别。
//! - **WebSocket 消息 (`ws_payloads`)**: 按角色与方向划分的封闭消息枚举。
//! - **有界日志 (`history`)**: 新条目在前、超出容量时淘汰最旧条目的环形缓冲。
//!
//! 设计原则：
//! - 所有线上模型都派生 `serde::Serialize` / `serde::Deserialize`，字段缺失取默认值。
//! - 所有模型都派生 `Debug` 和 `Clone`，便于日志输出与状态快照。

pub mod enums; // 通用枚举
pub mod caregiver; // 护理端实体
pub mod patient; // 患者端实体
pub mod ws_payloads; // WebSocket 消息词汇表
pub mod history; // 有界日志
