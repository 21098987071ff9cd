// PatientTerminal/src/input.rs

//! 键盘到输入意图的映射。

/// 按键对应的输入意图。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// 空格：确认当前注视的候选。
    ConfirmGazed,
    /// Escape：触发紧急事件。
    TriggerEmergency,
    /// `1`–`4`：直接选择对应下标的候选。
    Select(usize),
}

/// 将按键名映射为输入意图。按键名采用 DOM `KeyboardEvent.key` 的写法，其他按键返回 `None`。
pub fn map_key(key: &str) -> Option<KeyAction> {
    match key {
        " " | "Space" | "Spacebar" => Some(KeyAction::ConfirmGazed),
        "Escape" | "Esc" => Some(KeyAction::TriggerEmergency),
        "1" => Some(KeyAction::Select(0)),
        "2" => Some(KeyAction::Select(1)),
        "3" => Some(KeyAction::Select(2)),
        "4" => Some(KeyAction::Select(3)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(" "), Some(KeyAction::ConfirmGazed));
        assert_eq!(map_key("Escape"), Some(KeyAction::TriggerEmergency));
        assert_eq!(map_key("1"), Some(KeyAction::Select(0)));
        assert_eq!(map_key("4"), Some(KeyAction::Select(3)));
        assert_eq!(map_key("5"), None);
        assert_eq!(map_key("a"), None);
    }
}
