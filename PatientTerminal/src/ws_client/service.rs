// PatientTerminal/src/ws_client/service.rs

//! 患者端客户端服务。
//!
//! 事件循环独占状态存储、连接驱动器与分发器，串行处理连接事件、模式恢复定时器和
//! 通过 [`PatientHandle`] 提交的输入意图。

use chrono::Utc;
use common_models::enums::{InputSource, TransitionAuthority};
use common_models::ws_payloads::PatientOutbound;
use log::{debug, error, info, warn};
use rust_websocket_utils::client::{
    ConnectionDriver, ConnectionEvent, DriverOutput, FrameSender, SendOutcome,
};
use rust_websocket_utils::message::encode_frame;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::audio::AudioPlayer;
use crate::candidates::{self, SelectOutcome};
use crate::config::AppConfig;
use crate::emergency::{self, RevertTimer};
use crate::error::AppError;
use crate::event::StoreEvent;
use crate::input::{map_key, KeyAction};
use crate::state::{InputMode, PatientSnapshot, PatientStore};
use crate::ws_client::dispatcher::{Dispatched, PatientDispatcher};

#[derive(Debug)]
pub enum PatientCommand {
    Connect,
    Reconnect,
    SelectCandidate {
        index: usize,
        reply: oneshot::Sender<SelectOutcome>,
    },
    ConfirmGazed(oneshot::Sender<SelectOutcome>),
    KeyPressed {
        key: String,
        reply: oneshot::Sender<Option<KeyAction>>,
    },
    TriggerEmergency {
        source: InputSource,
        category: Option<i32>,
        reply: oneshot::Sender<SendOutcome>,
    },
    CancelEmergency(oneshot::Sender<bool>),
    SetInputMode(InputMode),
    SetGazeZone(i32),
    SendGazeUpdate {
        zone_id: i32,
        confidence: f64,
        reply: oneshot::Sender<SendOutcome>,
    },
    Snapshot(oneshot::Sender<PatientSnapshot>),
    Subscribe(oneshot::Sender<mpsc::UnboundedReceiver<StoreEvent>>),
    Shutdown(oneshot::Sender<()>),
}

/// 患者端客户端服务的句柄。
#[derive(Clone)]
pub struct PatientHandle {
    request_tx: mpsc::Sender<PatientCommand>,
}

impl PatientHandle {
    async fn submit_request(&self, command: PatientCommand) -> Result<(), AppError> {
        debug!("[患者端] 提交请求: {:?}", command);
        self.request_tx.send(command).await.map_err(|_| AppError::ServiceStopped)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> PatientCommand) -> Result<T, AppError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit_request(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| AppError::ServiceStopped)
    }

    pub async fn connect(&self) -> Result<(), AppError> {
        self.submit_request(PatientCommand::Connect).await
    }

    /// 手动重连。重试次数耗尽后只能通过它恢复连接。
    pub async fn reconnect(&self) -> Result<(), AppError> {
        self.submit_request(PatientCommand::Reconnect).await
    }

    pub async fn select_candidate(&self, index: usize) -> Result<SelectOutcome, AppError> {
        self.request(|reply| PatientCommand::SelectCandidate { index, reply }).await
    }

    pub async fn confirm_gazed(&self) -> Result<SelectOutcome, AppError> {
        self.request(PatientCommand::ConfirmGazed).await
    }

    /// 处理一次按键，返回按键对应的意图 (未映射的按键返回 `None`)。
    pub async fn key_pressed(&self, key: &str) -> Result<Option<KeyAction>, AppError> {
        let key = key.to_string();
        self.request(|reply| PatientCommand::KeyPressed { key, reply }).await
    }

    pub async fn trigger_emergency(&self, source: InputSource, category: Option<i32>) -> Result<SendOutcome, AppError> {
        self.request(|reply| PatientCommand::TriggerEmergency {
            source,
            category,
            reply,
        })
        .await
    }

    pub async fn cancel_emergency(&self) -> Result<bool, AppError> {
        self.request(PatientCommand::CancelEmergency).await
    }

    pub async fn set_input_mode(&self, mode: InputMode) -> Result<(), AppError> {
        self.submit_request(PatientCommand::SetInputMode(mode)).await
    }

    pub async fn set_gaze_zone(&self, zone: i32) -> Result<(), AppError> {
        self.submit_request(PatientCommand::SetGazeZone(zone)).await
    }

    pub async fn send_gaze_update(&self, zone_id: i32, confidence: f64) -> Result<SendOutcome, AppError> {
        self.request(|reply| PatientCommand::SendGazeUpdate {
            zone_id,
            confidence,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<PatientSnapshot, AppError> {
        self.request(PatientCommand::Snapshot).await
    }

    pub async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<StoreEvent>, AppError> {
        self.request(PatientCommand::Subscribe).await
    }

    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.request(PatientCommand::Shutdown).await
    }
}

/// 发送一次注视更新，时间戳取当前时间。
pub(crate) fn send_gaze_update(sender: &mut dyn FrameSender, zone_id: i32, confidence: f64) -> SendOutcome {
    let message = PatientOutbound::GazeUpdate {
        zone_id,
        confidence,
        timestamp_ms: Utc::now().timestamp_millis(),
    };
    match encode_frame(&message) {
        Ok(frame) => sender.send_text(frame),
        Err(e) => {
            warn!("[患者端] 编码注视更新失败: {}", e);
            SendOutcome::Dropped
        }
    }
}

struct EventLoop {
    store: PatientStore,
    driver: ConnectionDriver,
    dispatcher: PatientDispatcher,
    revert_tx: mpsc::UnboundedSender<u64>,
    pending_revert: Option<JoinHandle<()>>,
}

enum Flow {
    Continue,
    Stop,
}

impl EventLoop {
    fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match self.driver.handle(event) {
            Some(DriverOutput::StateChanged(state)) => {
                info!("[患者端] 连接状态: {}", state);
                self.store.set_connection_state(state);
            }
            Some(DriverOutput::RetriesExhausted) => {
                warn!("[患者端] 重连次数已用尽，等待手动重连");
                self.store.set_connection_state(self.driver.state());
                self.store.set_reconnect_exhausted(true);
            }
            Some(DriverOutput::Inbound(text)) => {
                if let Dispatched::EmergencyAck { revert: Some(timer) } =
                    self.dispatcher.dispatch_frame(&text, &mut self.store)
                {
                    self.schedule_revert(timer);
                }
            }
            None => {}
        }
    }

    fn schedule_revert(&mut self, timer: RevertTimer) {
        if let Some(previous) = self.pending_revert.take() {
            previous.abort();
        }
        info!("[患者端] {:?} 后退出紧急模式 (纪元 {})", timer.delay, timer.epoch);
        let revert_tx = self.revert_tx.clone();
        self.pending_revert = Some(tokio::spawn(async move {
            tokio::time::sleep(timer.delay).await;
            let _ = revert_tx.send(timer.epoch);
        }));
    }

    fn handle_key(&mut self, key: &str) -> Option<KeyAction> {
        let action = map_key(key)?;
        match action {
            KeyAction::ConfirmGazed => {
                candidates::confirm_gazed(&mut self.store, &mut self.driver);
            }
            KeyAction::TriggerEmergency => {
                emergency::trigger(&mut self.store, &mut self.driver, InputSource::Keyboard, None);
            }
            KeyAction::Select(index) => {
                candidates::select(&mut self.store, &mut self.driver, index);
            }
        }
        Some(action)
    }

    fn handle_command(&mut self, command: PatientCommand) -> Flow {
        match command {
            PatientCommand::Connect => {
                let state = self.driver.connect();
                self.store.set_reconnect_exhausted(false);
                self.store.set_connection_state(state);
            }
            PatientCommand::Reconnect => {
                let state = self.driver.reconnect();
                self.store.set_reconnect_exhausted(false);
                self.store.set_connection_state(state);
            }
            PatientCommand::SelectCandidate { index, reply } => {
                let _ = reply.send(candidates::select(&mut self.store, &mut self.driver, index));
            }
            PatientCommand::ConfirmGazed(reply) => {
                let _ = reply.send(candidates::confirm_gazed(&mut self.store, &mut self.driver));
            }
            PatientCommand::KeyPressed { key, reply } => {
                let _ = reply.send(self.handle_key(&key));
            }
            PatientCommand::TriggerEmergency { source, category, reply } => {
                let _ = reply.send(emergency::trigger(&mut self.store, &mut self.driver, source, category));
            }
            PatientCommand::CancelEmergency(reply) => {
                let _ = reply.send(emergency::cancel(&mut self.store));
            }
            PatientCommand::SetInputMode(mode) => {
                self.store.set_input_mode(mode, TransitionAuthority::Optimistic);
            }
            PatientCommand::SetGazeZone(zone) => self.store.set_gaze_zone(zone),
            PatientCommand::SendGazeUpdate {
                zone_id,
                confidence,
                reply,
            } => {
                let _ = reply.send(send_gaze_update(&mut self.driver, zone_id, confidence));
            }
            PatientCommand::Snapshot(reply) => {
                let _ = reply.send(self.store.snapshot());
            }
            PatientCommand::Subscribe(reply) => {
                let _ = reply.send(self.store.subscribe());
            }
            PatientCommand::Shutdown(reply) => {
                self.teardown();
                let _ = reply.send(());
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn teardown(&mut self) {
        if let Some(pending) = self.pending_revert.take() {
            pending.abort();
        }
        self.driver.shutdown();
        self.store.set_reconnect_exhausted(false);
        self.store.set_connection_state(self.driver.state());
    }

    async fn run(
        mut self,
        mut request_rx: mpsc::Receiver<PatientCommand>,
        mut events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
        mut revert_rx: mpsc::UnboundedReceiver<u64>,
    ) {
        info!("[患者端] 事件循环已启动，目标: {}", self.driver.url());
        loop {
            tokio::select! {
                command = request_rx.recv() => match command {
                    Some(command) => {
                        if let Flow::Stop = self.handle_command(command) {
                            break;
                        }
                    }
                    None => {
                        warn!("[患者端] 所有句柄均已释放，关闭服务");
                        self.teardown();
                        break;
                    }
                },
                Some(event) = events_rx.recv() => self.handle_connection_event(event),
                Some(epoch) = revert_rx.recv() => {
                    self.pending_revert = None;
                    emergency::on_revert_due(&mut self.store, epoch);
                }
            }
        }
        info!("[患者端] 事件循环已退出");
    }
}

/// 启动患者端客户端服务。`auto_connect` 为真时立即发起连接。
pub fn spawn(config: &AppConfig, audio: Box<dyn AudioPlayer>) -> Result<(PatientHandle, JoinHandle<()>), AppError> {
    let url = config.endpoint_url().map_err(|e| {
        error!("[患者端] 后端地址无效: {}", e);
        e
    })?;
    let audio_base = config.audio_base()?;
    let (driver, events_rx) = ConnectionDriver::new("患者端", url, config.reconnect_policy());
    let (revert_tx, revert_rx) = mpsc::unbounded_channel();

    let mut event_loop = EventLoop {
        store: PatientStore::new(config.conversation_history_capacity),
        driver,
        dispatcher: PatientDispatcher::new(audio, audio_base, config.emergency_revert_delay()),
        revert_tx,
        pending_revert: None,
    };
    if config.auto_connect {
        let state = event_loop.driver.connect();
        event_loop.store.set_connection_state(state);
    }

    let (request_tx, request_rx) = mpsc::channel(32);
    let task = tokio::spawn(event_loop.run(request_rx, events_rx, revert_rx));
    Ok((PatientHandle { request_tx }, task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_models::patient::NO_GAZE_ZONE;
    use rust_websocket_utils::client::RecordingSender;

    #[test]
    fn test_gaze_update_wire_shape() {
        let mut sender = RecordingSender::connected();
        assert_eq!(send_gaze_update(&mut sender, 3, 0.82), SendOutcome::Sent);
        let sent = &sender.sent_json()[0];
        assert_eq!(sent["type"], "gaze_update");
        assert_eq!(sent["zone_id"], 3);
        assert_eq!(sent["confidence"], 0.82);
        assert!(sent["timestamp_ms"].as_i64().unwrap() > 0);

        let mut offline = RecordingSender::disconnected();
        assert_eq!(send_gaze_update(&mut offline, NO_GAZE_ZONE, 0.0), SendOutcome::Dropped);
    }
}
