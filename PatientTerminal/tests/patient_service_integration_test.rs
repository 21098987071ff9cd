// PatientTerminal/tests/patient_service_integration_test.rs

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{info, LevelFilter};
use patient_terminal::audio::RecordingPlayer;
use patient_terminal::candidates::SelectOutcome;
use patient_terminal::config::AppConfig;
use patient_terminal::input::KeyAction;
use patient_terminal::state::{CandidatePhase, InputMode, PatientSnapshot};
use patient_terminal::ws_client::{self, PatientHandle};
use rust_websocket_utils::client::{ConnectionState, ReconnectPolicy, ReconnectSettings, SendOutcome};
use rust_websocket_utils::server::transport::{ServerTransport, WsStream};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::Message as TungsteniteMessage;

fn init_test_logger() {
    let _ = env_logger::builder().filter_level(LevelFilter::Debug).is_test(true).try_init();
}

const CANDIDATE_FRAME: &str = r#"{"type":"candidate_update","request_id":"r1","is_final":true,"candidate_set":{"stage":2,"request_id":"r1","timestamp_ms":1700000000000,"is_final":true,"candidates":[{"text":"水がほしい","intent_axis":"action_request","confidence":0.9,"generation_stage":2},{"text":"体の向きを変えて","intent_axis":"action_request","confidence":0.8,"generation_stage":2},{"text":"ありがとう","intent_axis":"emotional_response","confidence":0.7,"generation_stage":2},{"text":"今何時？","intent_axis":"question","confidence":0.6,"generation_stage":2}]}}"#;

// 模拟后端：连接后推送候选集合；收到选择后回复语音就绪；收到紧急事件后回复 emergency_ack
async fn mock_backend(mut ws_stream: WsStream, peer_addr: SocketAddr, received: mpsc::UnboundedSender<Value>) {
    info!("[模拟后端] 患者端已连接: {}", peer_addr);
    if ws_stream.send(TungsteniteMessage::Text(CANDIDATE_FRAME.to_string())).await.is_err() {
        return;
    }
    while let Some(Ok(msg)) = ws_stream.next().await {
        let TungsteniteMessage::Text(text) = msg else { continue };
        let Ok(value) = serde_json::from_str::<Value>(&text) else { continue };
        let reply = match value["type"].as_str() {
            Some("candidate_selected") => Some(r#"{"type":"tts_ready","audio_url":"/audio/r1.wav","text":"ありがとう","duration_ms":900}"#),
            Some("input_event") => Some(r#"{"type":"emergency_ack","notified_caregivers":["caregiver-1"]}"#),
            _ => None,
        };
        let _ = received.send(value);
        if let Some(reply) = reply {
            let _ = ws_stream.send(TungsteniteMessage::Text(reply.to_string())).await;
        }
    }
}

async fn wait_for_snapshot(
    handle: &PatientHandle,
    what: &str,
    predicate: impl Fn(&PatientSnapshot) -> bool,
) -> PatientSnapshot {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = handle.snapshot().await.expect("服务已停止");
        if predicate(&snapshot) {
            return snapshot;
        }
        if Instant::now() > deadline {
            panic!("等待 {} 超时，最后的快照: {:?}", what, snapshot);
        }
        sleep(Duration::from_millis(20)).await;
    }
}

async fn next_received(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("等待上行消息超时")
        .expect("模拟后端已退出")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_select_and_emergency_against_local_backend() {
    init_test_logger();

    let server = ServerTransport::bind("127.0.0.1:0").await.expect("无法绑定到随机端口");
    let addr = server.local_addr();
    let (received_tx, mut received_rx) = mpsc::unbounded_channel();
    let server_handle = tokio::spawn(server.serve(move |ws_stream: WsStream, peer_addr: SocketAddr| {
        mock_backend(ws_stream, peer_addr, received_tx.clone())
    }));

    let config = AppConfig {
        backend_ws_url: format!("ws://{}", addr),
        emergency_revert_ms: 100,
        ..AppConfig::default()
    };
    let player = RecordingPlayer::default();
    let (handle, task) = ws_client::spawn(&config, Box::new(player.clone())).expect("启动患者端服务失败");

    let snapshot = wait_for_snapshot(&handle, "候选集合", |s| s.candidate_phase == CandidatePhase::CandidatesPresented).await;
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    assert_eq!(snapshot.candidates.as_ref().map(|c| c.candidates.len()), Some(4));

    // 数字键 3 选择下标 2
    assert_eq!(handle.key_pressed("3").await.unwrap(), Some(KeyAction::Select(2)));
    let selected = next_received(&mut received_rx).await;
    assert_eq!(
        selected,
        serde_json::json!({"type": "candidate_selected", "request_id": "r1", "candidate_index": 2})
    );
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.candidate_phase, CandidatePhase::WaitingForCandidates);
    assert_eq!(snapshot.history[0].text, "ありがとう");

    let snapshot = wait_for_snapshot(&handle, "语音就绪", |s| s.last_tts.is_some()).await;
    assert_eq!(snapshot.last_tts.unwrap().audio_url, "http://127.0.0.1:8765/audio/r1.wav");
    assert_eq!(player.played().len(), 1);

    // 没有候选时按空格无效果
    handle.set_gaze_zone(0).await.unwrap();
    assert_eq!(handle.confirm_gazed().await.unwrap(), SelectOutcome::NoCandidates);

    // Escape 触发紧急事件：立即进入紧急模式，收到确认后按配置的延迟恢复
    assert_eq!(handle.key_pressed("Escape").await.unwrap(), Some(KeyAction::TriggerEmergency));
    assert_eq!(handle.snapshot().await.unwrap().input_mode, InputMode::Emergency);
    let input_event = next_received(&mut received_rx).await;
    assert_eq!(input_event["type"], "input_event");
    assert_eq!(input_event["event"]["event_type"], "EMERGENCY");
    assert_eq!(input_event["event"]["source"], "keyboard");

    wait_for_snapshot(&handle, "退出紧急模式", |s| s.input_mode == InputMode::Candidate).await;

    assert_eq!(handle.send_gaze_update(1, 0.9).await.unwrap(), SendOutcome::Sent);
    let gaze = next_received(&mut received_rx).await;
    assert_eq!(gaze["type"], "gaze_update");
    assert_eq!(gaze["zone_id"], 1);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
    assert!(handle.snapshot().await.is_err());

    server_handle.abort();
    let _ = server_handle.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_exhausted_retries_recover_only_by_manual_reconnect() {
    init_test_logger();

    let addr = {
        let server = ServerTransport::bind("127.0.0.1:0").await.unwrap();
        server.local_addr()
    };
    let config = AppConfig {
        backend_ws_url: format!("ws://{}", addr),
        reconnect: ReconnectSettings::from(&ReconnectPolicy::fixed(Duration::from_millis(20), 2)),
        ..AppConfig::default()
    };
    let (handle, task) = ws_client::spawn(&config, Box::new(RecordingPlayer::default())).unwrap();
    let mut events = handle.subscribe().await.unwrap();

    let snapshot = wait_for_snapshot(&handle, "重试耗尽", |s| s.reconnect_exhausted).await;
    assert_eq!(snapshot.connection_state, ConnectionState::Disconnected);
    // 重试耗尽后不再有任何连接状态变化
    sleep(Duration::from_millis(300)).await;
    while events.try_recv().is_ok() {}
    sleep(Duration::from_millis(200)).await;
    assert!(events.try_recv().is_err());
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.connection_state, ConnectionState::Disconnected);
    assert!(snapshot.reconnect_exhausted);

    // 在同一地址启动后端后手动重连
    let server = ServerTransport::bind(&addr.to_string()).await.expect("无法重新绑定端口");
    let server_handle = tokio::spawn(server.serve(|mut ws_stream: WsStream, _peer: SocketAddr| async move {
        while let Some(Ok(_)) = ws_stream.next().await {}
    }));
    handle.reconnect().await.unwrap();
    assert!(!handle.snapshot().await.unwrap().reconnect_exhausted);
    wait_for_snapshot(&handle, "重新连接", |s| s.connection_state == ConnectionState::Connected).await;

    handle.shutdown().await.unwrap();
    task.await.unwrap();
    server_handle.abort();
    let _ = server_handle.await;
}
