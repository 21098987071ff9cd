// rust_websocket_utils/src/client/driver.rs

//! 异步连接驱动器。
//!
//! 驱动器把 [`ConnectionManager`] 的决策落到实处：为每个代际启动一个套接字任务，
//! 在需要时启动重连定时器任务。所有任务都不直接修改任何状态，而是把带代际令牌的
//! [`ConnectionEvent`] 发送回客户端服务的事件循环，由事件循环调用 [`ConnectionDriver::handle`]
//! 串行处理。这样连接事件、定时器与用户意图都在同一个任务中按顺序处理。

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::connection_manager::{ConnectionManager, ConnectionState, Generation};
use super::reconnect::ReconnectPolicy;
use super::transport::{connect_client, receive_text};

/// 由套接字任务或定时器任务产生、送回事件循环的事件。
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Opened(Generation),
    Frame(Generation, String),
    Error(Generation, String),
    Closed(Generation),
    ReconnectDue(Generation),
}

/// [`ConnectionDriver::handle`] 处理事件后需要事件循环继续处理的结果。
#[derive(Debug, Clone, PartialEq)]
pub enum DriverOutput {
    /// 连接状态发生了变化，应写入状态存储。
    StateChanged(ConnectionState),
    /// 当前代际上收到的文本帧，应交给分发器。
    Inbound(String),
    /// 连接已断开 (`Disconnected`)，且有限重试策略已用尽，只能手动重连。
    RetriesExhausted,
}

/// 一次发送的结果。发送是"至多一次"的：未连接时消息被丢弃，不排队、不重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Dropped,
}

/// 发送文本帧的接口。领域状态机只依赖这个 trait，测试中可以替换为 [`RecordingSender`]。
pub trait FrameSender {
    fn send_text(&mut self, text: String) -> SendOutcome;
}

/// 记录所有发送内容的 [`FrameSender`]，用于测试领域逻辑。
#[derive(Debug, Clone)]
pub struct RecordingSender {
    pub connected: bool,
    pub sent: Vec<String>,
}

impl RecordingSender {
    pub fn connected() -> Self {
        Self { connected: true, sent: Vec::new() }
    }

    pub fn disconnected() -> Self {
        Self { connected: false, sent: Vec::new() }
    }

    /// 将已发送的帧解析为 JSON，便于断言。
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }
}

impl FrameSender for RecordingSender {
    fn send_text(&mut self, text: String) -> SendOutcome {
        if self.connected {
            self.sent.push(text);
            SendOutcome::Sent
        } else {
            SendOutcome::Dropped
        }
    }
}

struct LiveSocket {
    generation: Generation,
    outbound: mpsc::UnboundedSender<String>,
}

/// 单个角色连接的异步驱动器。
pub struct ConnectionDriver {
    label: &'static str,
    url: String,
    manager: ConnectionManager,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    socket: Option<LiveSocket>,
    timer: Option<JoinHandle<()>>,
}

impl ConnectionDriver {
    /// 创建驱动器，同时返回连接事件的接收端，由事件循环持有。
    ///
    /// `label` 是日志前缀，例如 `"护理端"`。
    pub fn new(
        label: &'static str,
        url: impl Into<String>,
        policy: ReconnectPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let driver = Self {
            label,
            url: url.into(),
            manager: ConnectionManager::new(policy),
            events_tx,
            socket: None,
            timer: None,
        };
        (driver, events_rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn generation(&self) -> Generation {
        self.manager.generation()
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 发起连接。已有的连接与定时器会先被拆除。
    pub fn connect(&mut self) -> ConnectionState {
        self.release_resources();
        let generation = self.manager.connect();
        self.spawn_socket(generation);
        self.manager.state()
    }

    /// 手动重连，清零重试计数。
    pub fn reconnect(&mut self) -> ConnectionState {
        self.release_resources();
        let generation = self.manager.reconnect();
        self.spawn_socket(generation);
        self.manager.state()
    }

    /// 拆除连接：作废当前代际、取消重连定时器、关闭套接字。
    pub fn shutdown(&mut self) {
        info!("[{}] 关闭连接驱动器", self.label);
        self.manager.teardown();
        self.release_resources();
    }

    /// 处理一个连接事件。
    pub fn handle(&mut self, event: ConnectionEvent) -> Option<DriverOutput> {
        match event {
            ConnectionEvent::Opened(generation) => {
                if self.manager.on_open(generation) {
                    Some(DriverOutput::StateChanged(ConnectionState::Connected))
                } else {
                    None
                }
            }
            ConnectionEvent::Frame(generation, text) => {
                if generation == self.manager.generation() && self.manager.can_send() {
                    Some(DriverOutput::Inbound(text))
                } else {
                    debug!("[{}] 丢弃过期代际 {} 的帧", self.label, generation);
                    None
                }
            }
            ConnectionEvent::Error(generation, detail) => {
                self.manager.on_error(generation, &detail);
                None
            }
            ConnectionEvent::Closed(generation) => {
                let before = self.manager.state();
                let timer = self.manager.on_close(generation);
                if self.socket.as_ref().is_some_and(|s| s.generation == generation) {
                    self.socket = None;
                }
                if let Some(timer) = timer {
                    let tx = self.events_tx.clone();
                    let due = timer.generation;
                    let delay = timer.delay;
                    self.timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(ConnectionEvent::ReconnectDue(due));
                    }));
                }
                let after = self.manager.state();
                if before == after {
                    None
                } else if self.manager.is_exhausted() {
                    Some(DriverOutput::RetriesExhausted)
                } else {
                    Some(DriverOutput::StateChanged(after))
                }
            }
            ConnectionEvent::ReconnectDue(generation) => {
                let next = self.manager.on_timer_fired(generation)?;
                self.timer = None;
                self.spawn_socket(next);
                Some(DriverOutput::StateChanged(self.manager.state()))
            }
        }
    }

    fn spawn_socket(&mut self, generation: Generation) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.socket = Some(LiveSocket {
            generation,
            outbound: outbound_tx,
        });
        tokio::spawn(run_socket(
            self.label,
            self.url.clone(),
            generation,
            self.events_tx.clone(),
            outbound_rx,
        ));
    }

    fn release_resources(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        // 丢弃发送端后，套接字任务会关闭连接并退出
        self.socket = None;
    }
}

impl FrameSender for ConnectionDriver {
    fn send_text(&mut self, text: String) -> SendOutcome {
        if !self.manager.can_send() {
            warn!("[{}] 连接状态为 {}，丢弃待发送的消息: {}", self.label, self.manager.state(), text);
            return SendOutcome::Dropped;
        }
        match &self.socket {
            Some(socket) if socket.generation == self.manager.generation() => {
                if socket.outbound.send(text).is_ok() {
                    SendOutcome::Sent
                } else {
                    warn!("[{}] 套接字任务已退出，消息被丢弃", self.label);
                    SendOutcome::Dropped
                }
            }
            _ => {
                warn!("[{}] 没有可用的套接字，消息被丢弃", self.label);
                SendOutcome::Dropped
            }
        }
    }
}

impl Drop for ConnectionDriver {
    fn drop(&mut self) {
        self.release_resources();
    }
}

/// 单个代际的套接字任务。连接失败时先报告错误再报告关闭。
async fn run_socket(
    label: &'static str,
    url: String,
    generation: Generation,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
) {
    let mut connection = match connect_client(&url).await {
        Ok(connection) => connection,
        Err(e) => {
            let _ = events_tx.send(ConnectionEvent::Error(generation, e.to_string()));
            let _ = events_tx.send(ConnectionEvent::Closed(generation));
            return;
        }
    };
    if events_tx.send(ConnectionEvent::Opened(generation)).is_err() {
        return;
    }

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => match outbound {
                Some(text) => {
                    if let Err(e) = connection.send_text(text).await {
                        error!("[{}] 代际 {} 发送失败: {}", label, generation, e);
                        let _ = events_tx.send(ConnectionEvent::Error(generation, e.to_string()));
                        break;
                    }
                }
                None => {
                    debug!("[{}] 代际 {} 已被拆除，关闭套接字", label, generation);
                    let _ = connection.close().await;
                    break;
                }
            },
            inbound = receive_text(&mut connection.ws_receiver) => match inbound {
                Some(Ok(text)) => {
                    let _ = events_tx.send(ConnectionEvent::Frame(generation, text));
                }
                Some(Err(e)) => {
                    let _ = events_tx.send(ConnectionEvent::Error(generation, e.to_string()));
                    break;
                }
                None => break,
            },
        }
    }
    let _ = events_tx.send(ConnectionEvent::Closed(generation));
}
