// rust_websocket_utils/src/message.rs

//! 单帧 JSON 编解码。
//!
//! 线上协议约定每个 WebSocket 文本帧恰好承载一个 JSON 对象，并以 `type` 字段作为消息判别字段。
//! 本模块只负责"文本 ⇄ 类型化消息"的转换，不关心具体的消息词汇表；
//! 词汇表由 `common_models::ws_payloads` 中各角色的封闭枚举定义。

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::WsError;

/// 帧中消息判别字段的名称。
pub const TYPE_FIELD: &str = "type";

/// 将一个类型化消息编码为文本帧。
///
/// # Errors
/// 当消息无法序列化为 JSON 时返回 `WsError::SerializationError`。
pub fn encode_frame<T: Serialize>(message: &T) -> Result<String, WsError> {
    serde_json::to_string(message)
        .map_err(|e| WsError::SerializationError(format!("消息序列化为JSON失败: {}", e)))
}

/// 将一个文本帧解码为类型化消息。
///
/// 与直接调用 `serde_json::from_str` 不同，这里会先确认帧是带有字符串 `type` 字段的 JSON 对象，
/// 使"不是对象"、"缺少 type"与"字段内容非法"三种情况给出可区分的诊断信息。
///
/// # Errors
/// 任何解码失败都返回 `WsError::DeserializationError`，调用方应记录后丢弃该帧。
pub fn decode_frame<T: DeserializeOwned>(text: &str) -> Result<T, WsError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| WsError::DeserializationError(format!("帧不是合法的JSON: {}", e)))?;

    match value.get(TYPE_FIELD) {
        Some(serde_json::Value::String(_)) => {}
        Some(_) => {
            return Err(WsError::DeserializationError(
                "帧的 type 字段不是字符串".to_string(),
            ));
        }
        None => {
            return Err(WsError::DeserializationError(if value.is_object() {
                "帧缺少 type 字段".to_string()
            } else {
                "帧不是JSON对象".to_string()
            }));
        }
    }

    serde_json::from_value(value)
        .map_err(|e| WsError::DeserializationError(format!("帧内容无法解码: {}", e)))
}

/// 读取帧的 `type` 字段，仅用于日志与诊断。
pub fn peek_type(text: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()?
        .get(TYPE_FIELD)?
        .as_str()
        .map(str::to_string)
}
