// rust_websocket_utils/src/client/reconnect.rs

//! 重连退避策略。

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 一个角色连接的重连策略，创建后不再修改。
///
/// 第 `n` 次 (从 0 开始) 重连前的等待时间为 `min(initial_delay × multiplier^n, max_delay)`。
/// `max_attempts` 为 `None` 时永不放弃；为 `Some(k)` 时，第 `k` 次重连仍失败后连接永久断开。
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// 指数退避、无限重试。
    pub fn exponential(initial_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
            max_attempts: None,
        }
    }

    /// 固定间隔、有限次数重试。
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            max_attempts: Some(max_attempts),
        }
    }

    /// 护理端策略：1 秒起步，每次翻倍，上限 16 秒，无限重试。
    pub fn caregiver() -> Self {
        Self::exponential(Duration::from_millis(1_000), 2.0, Duration::from_millis(16_000))
    }

    /// 患者端策略：固定 3 秒，最多 10 次。
    pub fn patient() -> Self {
        Self::fixed(Duration::from_millis(3_000), 10)
    }

    /// 第 `attempt` 次重连前的等待时间。
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let initial_ms = self.initial_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        // powi 的指数是 i32，超过后结果早已被上限截断
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let scaled = initial_ms * self.multiplier.max(1.0).powi(exponent);
        let capped = if scaled.is_finite() { scaled.min(max_ms) } else { max_ms };
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// 已经进行了 `attempts` 次重连之后，是否还允许继续重连。
    pub fn allows_attempt(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::caregiver()
    }
}

/// 配置文件中的重连参数，以毫秒为单位。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReconnectSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// `null` 表示无限重试。
    pub max_attempts: Option<u32>,
}

impl ReconnectSettings {
    pub fn to_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            // 上限不得小于起始间隔
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms)),
            multiplier: self.multiplier,
            max_attempts: self.max_attempts,
        }
    }
}

impl From<&ReconnectPolicy> for ReconnectSettings {
    fn from(policy: &ReconnectPolicy) -> Self {
        Self {
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            multiplier: policy.multiplier,
            max_attempts: policy.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caregiver_backoff_sequence() {
        let policy = ReconnectPolicy::caregiver();
        let delays: Vec<u64> = (0..7).map(|n| policy.delay_for(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 16_000, 16_000, 16_000]);
        // 极大的尝试次数不会溢出
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(16_000));
        assert!(policy.allows_attempt(1_000_000));
    }

    #[test]
    fn test_patient_policy_is_fixed_and_bounded() {
        let policy = ReconnectPolicy::patient();
        for n in 0..10 {
            assert_eq!(policy.delay_for(n), Duration::from_millis(3_000));
            assert!(policy.allows_attempt(n));
        }
        assert!(!policy.allows_attempt(10));
    }

    #[test]
    fn test_settings_convert_to_policy() {
        let settings = ReconnectSettings::from(&ReconnectPolicy::patient());
        assert_eq!(settings.initial_delay_ms, 3_000);
        assert_eq!(settings.max_attempts, Some(10));
        assert_eq!(settings.to_policy(), ReconnectPolicy::patient());

        let json = r#"{"initial_delay_ms":500,"max_delay_ms":100,"multiplier":3.0,"max_attempts":null}"#;
        let policy = serde_json::from_str::<ReconnectSettings>(json).unwrap().to_policy();
        assert_eq!(policy.max_delay, Duration::from_millis(500));
        assert!(policy.max_attempts.is_none());
    }
}
