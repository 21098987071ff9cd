// CaregiverConsole/src/ws_client/service.rs

//! 护理端客户端服务。
//!
//! [`spawn`] 启动一个事件循环任务，该任务独占状态存储、连接驱动器与通知引擎，
//! 并串行处理三类事件：连接事件 (打开、帧、错误、关闭、重连定时器)、以及通过
//! [`CaregiverHandle`] 提交的用户意图。存储因此只有一个写者，不需要任何锁。

use common_models::ws_payloads::CaregiverOutbound;
use log::{debug, error, info, warn};
use rust_websocket_utils::client::{
    ConnectionDriver, ConnectionEvent, DriverOutput, FrameSender, SendOutcome,
};
use rust_websocket_utils::message::encode_frame;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::emergency::{self, AcknowledgeOutcome};
use crate::error::AppError;
use crate::event::StoreEvent;
use crate::notification::{NotificationEngine, NotificationPlatform};
use crate::state::{CaregiverSnapshot, CaregiverStore, View};
use crate::ws_client::dispatcher;

/// 从句柄发送给事件循环的请求。
#[derive(Debug)]
pub enum CaregiverCommand {
    Connect,
    Reconnect,
    AcknowledgeEmergency(oneshot::Sender<AcknowledgeOutcome>),
    AcknowledgeNotification {
        id: u64,
        reply: oneshot::Sender<Option<SendOutcome>>,
    },
    Navigate(View),
    Snapshot(oneshot::Sender<CaregiverSnapshot>),
    Subscribe(oneshot::Sender<mpsc::UnboundedReceiver<StoreEvent>>),
    Shutdown(oneshot::Sender<()>),
}

/// 护理端客户端服务的句柄。可以克隆并在多个任务间共享。
#[derive(Clone)]
pub struct CaregiverHandle {
    request_tx: mpsc::Sender<CaregiverCommand>,
}

impl CaregiverHandle {
    async fn submit_request(&self, command: CaregiverCommand) -> Result<(), AppError> {
        debug!("[护理端] 提交请求: {:?}", command);
        self.request_tx.send(command).await.map_err(|_| AppError::ServiceStopped)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> CaregiverCommand) -> Result<T, AppError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit_request(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| AppError::ServiceStopped)
    }

    /// 发起连接。
    pub async fn connect(&self) -> Result<(), AppError> {
        self.submit_request(CaregiverCommand::Connect).await
    }

    /// 手动重连，清零重试计数。
    pub async fn reconnect(&self) -> Result<(), AppError> {
        self.submit_request(CaregiverCommand::Reconnect).await
    }

    /// 确认当前的紧急事件。紧急记录要等服务器的 `emergency_ack` 才会清除。
    pub async fn acknowledge_emergency(&self) -> Result<AcknowledgeOutcome, AppError> {
        self.request(CaregiverCommand::AcknowledgeEmergency).await
    }

    /// 确认并移除一条通知。通知不存在时返回 `None`。
    pub async fn acknowledge_notification(&self, id: u64) -> Result<Option<SendOutcome>, AppError> {
        self.request(|reply| CaregiverCommand::AcknowledgeNotification { id, reply })
            .await
    }

    pub async fn navigate(&self, view: View) -> Result<(), AppError> {
        self.submit_request(CaregiverCommand::Navigate(view)).await
    }

    pub async fn snapshot(&self) -> Result<CaregiverSnapshot, AppError> {
        self.request(CaregiverCommand::Snapshot).await
    }

    /// 订阅此后提交的所有状态变更。
    pub async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<StoreEvent>, AppError> {
        self.request(CaregiverCommand::Subscribe).await
    }

    /// 关闭服务：作废当前连接代际、取消重连定时器、关闭套接字，然后退出事件循环。
    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.request(CaregiverCommand::Shutdown).await
    }
}

/// 确认一条通知：按发送时的位置计算 `index` 并发送，然后在本地移除 (乐观)。
pub(crate) fn acknowledge_notification(
    store: &mut CaregiverStore,
    sender: &mut dyn FrameSender,
    id: u64,
) -> Option<SendOutcome> {
    let index = store.notification_index(id)?;
    let outcome = match encode_frame(&CaregiverOutbound::AcknowledgeNotification { index }) {
        Ok(frame) => sender.send_text(frame),
        Err(e) => {
            warn!("[护理端] 编码通知确认消息失败: {}", e);
            SendOutcome::Dropped
        }
    };
    store.remove_notification(id);
    Some(outcome)
}

struct EventLoop {
    store: CaregiverStore,
    driver: ConnectionDriver,
    notifier: NotificationEngine,
}

enum Flow {
    Continue,
    Stop,
}

impl EventLoop {
    fn apply(&mut self, output: DriverOutput) {
        match output {
            DriverOutput::StateChanged(state) => {
                info!("[护理端] 连接状态: {}", state);
                self.store.set_connection_state(state);
            }
            DriverOutput::RetriesExhausted => {
                warn!("[护理端] 重连次数已用尽，等待手动重连");
                self.store.set_connection_state(self.driver.state());
                self.store.set_reconnect_exhausted(true);
            }
            DriverOutput::Inbound(text) => {
                dispatcher::dispatch_frame(&text, &mut self.store, &mut self.notifier);
            }
        }
    }

    fn handle_connection_event(&mut self, event: ConnectionEvent) {
        if let Some(output) = self.driver.handle(event) {
            self.apply(output);
        }
    }

    fn handle_command(&mut self, command: CaregiverCommand) -> Flow {
        match command {
            CaregiverCommand::Connect => {
                let state = self.driver.connect();
                self.store.set_reconnect_exhausted(false);
                self.store.set_connection_state(state);
            }
            CaregiverCommand::Reconnect => {
                let state = self.driver.reconnect();
                self.store.set_reconnect_exhausted(false);
                self.store.set_connection_state(state);
            }
            CaregiverCommand::AcknowledgeEmergency(reply) => {
                let outcome = emergency::acknowledge(&mut self.store, &mut self.driver);
                let _ = reply.send(outcome);
            }
            CaregiverCommand::AcknowledgeNotification { id, reply } => {
                let outcome = acknowledge_notification(&mut self.store, &mut self.driver, id);
                let _ = reply.send(outcome);
            }
            CaregiverCommand::Navigate(view) => self.store.navigate(view),
            CaregiverCommand::Snapshot(reply) => {
                let _ = reply.send(self.store.snapshot());
            }
            CaregiverCommand::Subscribe(reply) => {
                let _ = reply.send(self.store.subscribe());
            }
            CaregiverCommand::Shutdown(reply) => {
                self.teardown();
                let _ = reply.send(());
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn teardown(&mut self) {
        self.driver.shutdown();
        self.store.set_reconnect_exhausted(false);
        self.store.set_connection_state(self.driver.state());
    }

    async fn run(
        mut self,
        mut request_rx: mpsc::Receiver<CaregiverCommand>,
        mut events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    ) {
        info!("[护理端] 事件循环已启动，目标: {}", self.driver.url());
        loop {
            tokio::select! {
                command = request_rx.recv() => match command {
                    Some(command) => {
                        if let Flow::Stop = self.handle_command(command) {
                            break;
                        }
                    }
                    None => {
                        warn!("[护理端] 所有句柄均已释放，关闭服务");
                        self.teardown();
                        break;
                    }
                },
                Some(event) = events_rx.recv() => self.handle_connection_event(event),
            }
        }
        info!("[护理端] 事件循环已退出");
    }
}

/// 启动护理端客户端服务。
///
/// 启动时请求一次通知权限；`auto_connect` 为真时立即发起连接。
pub fn spawn(
    config: &AppConfig,
    platform: Box<dyn NotificationPlatform>,
) -> Result<(CaregiverHandle, JoinHandle<()>), AppError> {
    let url = config.endpoint_url().map_err(|e| {
        error!("[护理端] 后端地址无效: {}", e);
        e
    })?;
    let (driver, events_rx) = ConnectionDriver::new("护理端", url, config.reconnect_policy());
    let mut notifier = NotificationEngine::new(platform, config.notifications_enabled);
    notifier.request_permission();

    let mut event_loop = EventLoop {
        store: CaregiverStore::new(),
        driver,
        notifier,
    };
    if config.auto_connect {
        let state = event_loop.driver.connect();
        event_loop.store.set_connection_state(state);
    }

    let (request_tx, request_rx) = mpsc::channel(32);
    let task = tokio::spawn(event_loop.run(request_rx, events_rx));
    Ok((CaregiverHandle { request_tx }, task))
}
