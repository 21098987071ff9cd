//! `PatientTerminal` 患者端客户端库。
//!
//! 患者端通过 `/ws/patient` 接收候选短语与语音就绪通知，把注视、按键与紧急输入转换为
//! 上行消息，并在本地维护输入模式、候选集合与会话历史。

pub mod audio;          // 语音地址解析与播放接口
pub mod candidates;     // 候选状态机
pub mod config;         // 配置加载与保存
pub mod emergency;      // 紧急输入与模式恢复
pub mod error;          // 应用级错误类型
pub mod event;          // 状态存储发布的变更事件
pub mod input;          // 按键与注视区域映射
pub mod state;          // 单写者状态存储
pub mod ws_client;      // 分发器与客户端服务
