// rust_websocket_utils/src/client/connection_manager.rs

//! 连接生命周期状态机。
//!
//! `ConnectionManager` 不做任何 I/O：它只根据"打开 / 出错 / 关闭 / 定时器到期"等事件推进
//! [`ConnectionState`]，并告诉调用方何时需要发起新连接、何时需要安排重连定时器。
//! 真正的套接字任务与定时器任务由 [`super::driver::ConnectionDriver`] 负责。
//!
//! 每一次发起连接都会分配一个单调递增的 [`Generation`] 令牌，套接字事件与定时器事件都携带
//! 创建它们时的令牌。令牌与当前代际不一致的事件一律视为过期，直接忽略。

use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;

use super::reconnect::ReconnectPolicy;

/// 连接状态。只有连接管理器可以改变它。
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// 连接代际令牌。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 关闭事件之后需要安排的重连定时器。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectTimer {
    pub generation: Generation,
    pub delay: Duration,
}

/// 单个角色连接的生命周期状态机。
#[derive(Debug)]
pub struct ConnectionManager {
    policy: ReconnectPolicy,
    state: ConnectionState,
    generation: Generation,
    attempt: u32,
    pending_timer: Option<Generation>,
    exhausted: bool,
}

impl ConnectionManager {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Idle,
            generation: Generation::default(),
            attempt: 0,
            pending_timer: None,
            exhausted: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// 自上次成功打开以来已安排的重连次数。
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// 有限重试策略已用尽，连接永久断开。
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn has_pending_timer(&self) -> bool {
        self.pending_timer.is_some()
    }

    /// 只有在 `Connected` 状态下才允许发送。
    pub fn can_send(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// 开始一次新的连接尝试，返回新连接所属的代际。
    ///
    /// 旧代际的所有事件 (包括仍在等待的重连定时器) 从此全部作废。
    pub fn connect(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.pending_timer = None;
        self.exhausted = false;
        self.state = ConnectionState::Connecting;
        debug!("[连接管理器] 发起连接，代际 {}", self.generation);
        self.generation
    }

    /// 手动重连：清零重试计数并重新连接。这是离开永久断开状态的唯一途径。
    pub fn reconnect(&mut self) -> Generation {
        info!("[连接管理器] 手动重连，重试计数清零");
        self.attempt = 0;
        self.connect()
    }

    /// 连接已打开。返回 `false` 表示事件已过期。
    pub fn on_open(&mut self, generation: Generation) -> bool {
        if !self.is_current(generation) || self.state != ConnectionState::Connecting {
            debug!("[连接管理器] 忽略过期的打开事件 {}", generation);
            return false;
        }
        self.state = ConnectionState::Connected;
        self.attempt = 0;
        info!("[连接管理器] 连接已建立，代际 {}", generation);
        true
    }

    /// 套接字出错。错误总是先于关闭事件到达，重连只由关闭事件安排，因此这里不改变状态。
    pub fn on_error(&mut self, generation: Generation, detail: &str) {
        if self.is_current(generation) {
            warn!("[连接管理器] 连接 {} 出错: {}", generation, detail);
        } else {
            debug!("[连接管理器] 忽略过期的错误事件 {}: {}", generation, detail);
        }
    }

    /// 连接已关闭。如需重连，返回要安排的定时器。
    ///
    /// 过期的关闭事件、同一代际的重复关闭事件都不会再次安排定时器。
    pub fn on_close(&mut self, generation: Generation) -> Option<ReconnectTimer> {
        if !self.is_current(generation) {
            debug!("[连接管理器] 忽略过期的关闭事件 {}", generation);
            return None;
        }
        if self.state == ConnectionState::Disconnected || self.state == ConnectionState::Idle {
            debug!("[连接管理器] 忽略重复的关闭事件 {}", generation);
            return None;
        }
        self.state = ConnectionState::Disconnected;

        if !self.policy.allows_attempt(self.attempt) {
            self.exhausted = true;
            warn!(
                "[连接管理器] 已重连 {} 次仍未成功，连接永久断开",
                self.attempt
            );
            return None;
        }

        let delay = self.policy.delay_for(self.attempt);
        self.attempt += 1;
        self.pending_timer = Some(generation);
        info!(
            "[连接管理器] 连接 {} 已关闭，{} 毫秒后进行第 {} 次重连",
            generation,
            delay.as_millis(),
            self.attempt
        );
        Some(ReconnectTimer { generation, delay })
    }

    /// 重连定时器到期。若定时器仍然有效，发起新连接并返回新代际。
    pub fn on_timer_fired(&mut self, generation: Generation) -> Option<Generation> {
        if self.pending_timer != Some(generation) || !self.is_current(generation) {
            debug!("[连接管理器] 忽略过期的重连定时器 {}", generation);
            return None;
        }
        Some(self.connect())
    }

    /// 拆除连接：作废当前代际并取消待定的重连定时器。关闭套接字由调用方负责。
    pub fn teardown(&mut self) {
        self.generation = self.generation.next();
        self.pending_timer = None;
        self.exhausted = false;
        self.state = ConnectionState::Idle;
        debug!("[连接管理器] 已拆除连接，当前代际作废");
    }

    fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
    }
}
