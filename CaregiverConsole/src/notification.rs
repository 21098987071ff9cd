// CaregiverConsole/src/notification.rs

//! 系统通知投递与升级。
//!
//! [`NotificationEngine`] 负责通知权限与去重标签，实际的系统调用通过 [`NotificationPlatform`] 完成。
//! 权限被拒绝或平台不支持时静默跳过投递；振动不受支持时静默降级。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use common_models::caregiver::Notification;
use log::{debug, info};
use uuid::Uuid;

/// 紧急通知的振动模式 (毫秒)：振动、停顿、振动、停顿、长振动。
pub const EMERGENCY_VIBRATION_PATTERN: [u32; 5] = [200, 100, 200, 100, 400];

/// 显式标记紧急通知的标签。
pub const EMERGENCY_TAG: &str = "emergency";

/// 通知权限状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// 平台不支持系统通知。
    Unsupported,
    Supported { granted: bool },
}

impl NotificationPermission {
    pub fn is_granted(self) -> bool {
        matches!(self, NotificationPermission::Supported { granted: true })
    }
}

/// 交给平台显示的一条系统通知。
#[derive(Debug, Clone, PartialEq)]
pub struct OsNotification {
    pub title: String,
    pub body: String,
    /// 去重标签：相同标签的新通知替换旧通知。
    pub tag: String,
    pub require_interaction: bool,
}

/// 系统通知能力的抽象。
pub trait NotificationPlatform: Send {
    /// 当前的权限状态，不弹出任何请求。
    fn permission(&self) -> NotificationPermission;

    /// 请求通知权限，返回请求后的状态。
    fn request_permission(&mut self) -> NotificationPermission;

    /// 显示通知。失败视为能力错误，由调用方静默忽略。
    fn show(&mut self, notification: &OsNotification) -> Result<(), String>;

    /// 触发振动。平台不支持时返回 `false`。
    fn vibrate(&mut self, pattern: &[u32]) -> bool;
}

/// 只把通知写入日志的平台，用于没有桌面通知能力的运行环境。
#[derive(Debug, Default)]
pub struct LogOnlyPlatform;

impl NotificationPlatform for LogOnlyPlatform {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Supported { granted: true }
    }

    fn request_permission(&mut self) -> NotificationPermission {
        self.permission()
    }

    fn show(&mut self, notification: &OsNotification) -> Result<(), String> {
        info!(
            "[系统通知] [{}] {} - {}{}",
            notification.tag,
            notification.title,
            notification.body,
            if notification.require_interaction { " (需要手动关闭)" } else { "" }
        );
        Ok(())
    }

    fn vibrate(&mut self, _pattern: &[u32]) -> bool {
        false
    }
}

/// [`RecordingPlatform`] 记录下来的调用。
#[derive(Debug, Default)]
pub struct PlatformLog {
    pub shown: Vec<OsNotification>,
    pub vibrations: Vec<Vec<u32>>,
    pub permission_requests: u32,
}

/// 记录所有调用的平台，用于测试。克隆体共享同一份记录，因此平台交给引擎后仍可检查。
#[derive(Debug, Clone)]
pub struct RecordingPlatform {
    pub permission: NotificationPermission,
    /// 用户被请求权限时的回答。
    pub grant_on_request: bool,
    pub supports_vibration: bool,
    log: Arc<Mutex<PlatformLog>>,
}

impl RecordingPlatform {
    pub fn granted() -> Self {
        Self {
            permission: NotificationPermission::Supported { granted: true },
            grant_on_request: true,
            supports_vibration: true,
            log: Arc::new(Mutex::new(PlatformLog::default())),
        }
    }

    pub fn shown(&self) -> Vec<OsNotification> {
        self.log.lock().map(|log| log.shown.clone()).unwrap_or_default()
    }

    pub fn vibrations(&self) -> Vec<Vec<u32>> {
        self.log.lock().map(|log| log.vibrations.clone()).unwrap_or_default()
    }

    pub fn permission_requests(&self) -> u32 {
        self.log.lock().map(|log| log.permission_requests).unwrap_or_default()
    }
}

impl NotificationPlatform for RecordingPlatform {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&mut self) -> NotificationPermission {
        if let Ok(mut log) = self.log.lock() {
            log.permission_requests += 1;
        }
        if let NotificationPermission::Supported { .. } = self.permission {
            self.permission = NotificationPermission::Supported {
                granted: self.grant_on_request,
            };
        }
        self.permission
    }

    fn show(&mut self, notification: &OsNotification) -> Result<(), String> {
        let mut log = self.log.lock().map_err(|e| e.to_string())?;
        log.shown.push(notification.clone());
        Ok(())
    }

    fn vibrate(&mut self, pattern: &[u32]) -> bool {
        if !self.supports_vibration {
            return false;
        }
        if let Ok(mut log) = self.log.lock() {
            log.vibrations.push(pattern.to_vec());
        }
        true
    }
}

/// 一次投递请求。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeliveryRequest {
    pub title: String,
    pub body: String,
    pub tag: Option<String>,
}

impl DeliveryRequest {
    /// 由服务器推送的通知构造投递请求。紧急级别的通知使用紧急标签。
    pub fn from_notification(notification: &Notification) -> Self {
        Self {
            title: notification.title.clone(),
            body: notification.body.clone(),
            tag: notification.is_emergency().then(|| EMERGENCY_TAG.to_string()),
        }
    }

    /// 标签为 `emergency`，或标题包含 `緊急` / `emergency` (不区分大小写) 时视为紧急。
    pub fn is_emergency(&self) -> bool {
        let title = self.title.to_lowercase();
        self.tag.as_deref() == Some(EMERGENCY_TAG) || title.contains("緊急") || title.contains("emergency")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered(OsNotification),
    /// 权限未授予、平台不支持或已在配置中关闭。
    Skipped,
}

pub struct NotificationEngine {
    platform: Box<dyn NotificationPlatform>,
    permission: NotificationPermission,
    enabled: bool,
    // 当前显示中的通知，按标签去重
    displayed: HashMap<String, OsNotification>,
}

impl NotificationEngine {
    pub fn new(platform: Box<dyn NotificationPlatform>, enabled: bool) -> Self {
        let permission = platform.permission();
        Self {
            platform,
            permission,
            enabled,
            displayed: HashMap::new(),
        }
    }

    pub fn permission(&self) -> NotificationPermission {
        self.permission
    }

    /// 启动时请求一次权限。已授予或平台不支持时不再请求。
    pub fn request_permission(&mut self) -> NotificationPermission {
        self.permission = match self.permission {
            NotificationPermission::Supported { granted: false } => self.platform.request_permission(),
            other => other,
        };
        info!("[通知引擎] 通知权限状态: {:?}", self.permission);
        self.permission
    }

    /// 当前显示中的通知 (每个标签至多一条)。
    pub fn displayed(&self, tag: &str) -> Option<&OsNotification> {
        self.displayed.get(tag)
    }

    pub fn deliver(&mut self, request: DeliveryRequest) -> DeliveryOutcome {
        if !self.enabled || !self.permission.is_granted() {
            debug!("[通知引擎] 通知未投递 (启用: {}, 权限: {:?}): {}", self.enabled, self.permission, request.title);
            return DeliveryOutcome::Skipped;
        }

        let emergency = request.is_emergency();
        let tag = request
            .tag
            .clone()
            .unwrap_or_else(|| format!("voicereach-{}", Uuid::new_v4()));
        let notification = OsNotification {
            title: request.title,
            body: request.body,
            tag: tag.clone(),
            require_interaction: emergency,
        };

        if let Err(e) = self.platform.show(&notification) {
            debug!("[通知引擎] 平台显示通知失败，已忽略: {}", e);
            return DeliveryOutcome::Skipped;
        }
        if emergency && !self.platform.vibrate(&EMERGENCY_VIBRATION_PATTERN) {
            debug!("[通知引擎] 平台不支持振动");
        }
        if self.displayed.insert(tag, notification.clone()).is_some() {
            debug!("[通知引擎] 相同标签的旧通知已被替换: {}", notification.tag);
        }
        DeliveryOutcome::Delivered(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(platform: &RecordingPlatform) -> NotificationEngine {
        NotificationEngine::new(Box::new(platform.clone()), true)
    }

    fn request(title: &str, tag: Option<&str>) -> DeliveryRequest {
        DeliveryRequest {
            title: title.to_string(),
            body: "本文".to_string(),
            tag: tag.map(str::to_string),
        }
    }

    #[test]
    fn test_emergency_classification() {
        assert!(request("緊急通報", None).is_emergency());
        assert!(request("EMERGENCY call", None).is_emergency());
        assert!(request("お知らせ", Some("emergency")).is_emergency());
        assert!(!request("お知らせ", Some("daily")).is_emergency());
    }

    #[test]
    fn test_emergency_delivery_requires_interaction_and_vibrates() {
        let platform = RecordingPlatform::granted();
        let mut engine = engine_with(&platform);
        match engine.deliver(request("緊急通報", None)) {
            DeliveryOutcome::Delivered(n) => {
                assert!(n.require_interaction);
                assert!(n.tag.starts_with("voicereach-"));
            }
            DeliveryOutcome::Skipped => panic!("紧急通知应当被投递"),
        }
        assert_eq!(platform.shown().len(), 1);
        assert_eq!(platform.vibrations(), vec![EMERGENCY_VIBRATION_PATTERN.to_vec()]);
    }

    #[test]
    fn test_missing_vibration_degrades_silently() {
        let mut platform = RecordingPlatform::granted();
        platform.supports_vibration = false;
        let mut engine = engine_with(&platform);
        assert!(matches!(
            engine.deliver(request("x", Some(EMERGENCY_TAG))),
            DeliveryOutcome::Delivered(n) if n.require_interaction
        ));
        assert!(platform.vibrations().is_empty());
    }

    #[test]
    fn test_untagged_notifications_do_not_collapse() {
        let platform = RecordingPlatform::granted();
        let mut engine = engine_with(&platform);
        let a = engine.deliver(request("A", None));
        let b = engine.deliver(request("B", None));
        match (a, b) {
            (DeliveryOutcome::Delivered(a), DeliveryOutcome::Delivered(b)) => {
                assert_ne!(a.tag, b.tag);
                assert!(!a.require_interaction);
            }
            _ => panic!("两条通知都应当被投递"),
        }
        assert!(platform.vibrations().is_empty());
    }

    #[test]
    fn test_same_tag_replaces_previous() {
        let platform = RecordingPlatform::granted();
        let mut engine = engine_with(&platform);
        engine.deliver(request("first", Some("status")));
        engine.deliver(request("second", Some("status")));
        assert_eq!(engine.displayed("status").map(|n| n.title.as_str()), Some("second"));
    }

    #[test]
    fn test_denied_or_unsupported_permission_skips_silently() {
        let mut denied = RecordingPlatform::granted();
        denied.permission = NotificationPermission::Supported { granted: false };
        denied.grant_on_request = false;
        let mut engine = engine_with(&denied);
        assert_eq!(
            engine.request_permission(),
            NotificationPermission::Supported { granted: false }
        );
        assert_eq!(engine.deliver(request("緊急通報", None)), DeliveryOutcome::Skipped);
        assert!(denied.shown().is_empty());

        let mut unsupported = RecordingPlatform::granted();
        unsupported.permission = NotificationPermission::Unsupported;
        let mut engine = engine_with(&unsupported);
        assert_eq!(engine.request_permission(), NotificationPermission::Unsupported);
        assert_eq!(unsupported.permission_requests(), 0);
        assert_eq!(engine.deliver(request("A", None)), DeliveryOutcome::Skipped);
    }

    #[test]
    fn test_permission_request_can_grant() {
        let mut pending = RecordingPlatform::granted();
        pending.permission = NotificationPermission::Supported { granted: false };
        let mut engine = engine_with(&pending);
        assert!(engine.request_permission().is_granted());
        assert_eq!(pending.permission_requests(), 1);
        assert!(matches!(engine.deliver(request("A", None)), DeliveryOutcome::Delivered(_)));
    }

    #[test]
    fn test_disabled_engine_skips() {
        let platform = RecordingPlatform::granted();
        let mut engine = NotificationEngine::new(Box::new(platform.clone()), false);
        assert_eq!(engine.deliver(request("緊急通報", None)), DeliveryOutcome::Skipped);
        assert!(platform.shown().is_empty());
    }

    #[test]
    fn test_request_from_emergency_notification_uses_emergency_tag() {
        let notification = Notification {
            level: common_models::enums::NotificationLevel::Emergency,
            title: "呼吸が苦しい".to_string(),
            ..Notification::default()
        };
        let request = DeliveryRequest::from_notification(&notification);
        assert_eq!(request.tag.as_deref(), Some(EMERGENCY_TAG));
        assert!(request.is_emergency());
    }
}
