/*
[INPUT]:  Scripted transport sessions
[OUTPUT]: Test results for the trading stream lifecycle
[POS]:    Integration tests - trading stream supervisor and session
[UPDATE]: When stream lifecycle or dispatch semantics change
*/

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alpaca_trading_adapter::ws::ControlChannel;
use alpaca_trading_adapter::{
    OrderSide, SessionState, StreamError, TradeEvent, TradeUpdateEvent, TradingStream,
};
use common::{
    DISCONNECT, RecordingLogger, ScriptedTransport, auth_reply, fill_update_json, order_json,
    test_stream_config, trade_update_frame, wait_until,
};
use rust_decimal::Decimal;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_test::assert_ok;

type Received = Arc<Mutex<Vec<TradeUpdateEvent>>>;

const ORDER_1: &str = "61e69015-8549-4bfd-b9c3-01e75843f47d";
const ORDER_2: &str = "0a6ec1a4-3a3b-4f3e-9c0f-3c0b9e3d7d22";
const ORDER_3: &str = "c2f1b9e8-6d3e-4a21-8b57-0f8e2c1d9a33";

fn recording_handler(
    stream: &TradingStream<ScriptedTransport>,
) -> Received {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    assert_ok!(stream.subscribe_trade_updates(move |event: TradeUpdateEvent| {
        let sink = sink.clone();
        async move {
            sink.lock().expect("lock").push(event);
        }
    }));
    received
}

fn spawn_run(
    stream: &Arc<TradingStream<ScriptedTransport>>,
) -> JoinHandle<Result<(), StreamError>> {
    let stream = stream.clone();
    tokio::spawn(async move { stream.run_forever().await })
}

async fn stop_and_join(
    stream: &TradingStream<ScriptedTransport>,
    run: JoinHandle<Result<(), StreamError>>,
    limit: Duration,
) {
    assert_ok!(stream.stop());
    let result = tokio::time::timeout(limit, run)
        .await
        .expect("run loop should exit after stop")
        .expect("run task panicked");
    assert_ok!(result);
    assert_eq!(stream.state(), SessionState::Terminated);
    assert!(!stream.is_running());
}

fn received_len(received: &Received) -> usize {
    received.lock().expect("lock").len()
}

#[tokio::test]
async fn test_no_connection_without_handler() {
    let transport = ScriptedTransport::repeating(vec![auth_reply("authorized")]);
    let stream = Arc::new(TradingStream::with_transport(
        test_stream_config(),
        transport.clone(),
    ));

    let run = spawn_run(&stream);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(transport.connects(), 0);
    assert_eq!(stream.state(), SessionState::Idle);

    stop_and_join(&stream, run, Duration::from_secs(1)).await;
    assert_eq!(transport.connects(), 0);
}

#[tokio::test]
async fn test_pending_stop_terminates_before_connecting() {
    let transport = ScriptedTransport::repeating(vec![auth_reply("authorized")]);
    let stream = TradingStream::with_transport(test_stream_config(), transport.clone());

    stream.stop_ws();
    let result = tokio::time::timeout(Duration::from_secs(1), stream.run_forever())
        .await
        .expect("run loop should exit");

    assert_ok!(result);
    assert_eq!(transport.connects(), 0);
    assert_eq!(stream.state(), SessionState::Terminated);
}

#[test]
fn test_stop_signal_is_idempotent() {
    let channel = ControlChannel::new();
    channel.request_stop();
    channel.request_stop();

    assert!(channel.poll_stop());
    assert!(!channel.poll_stop());
}

#[test]
fn test_stop_before_run_is_rejected() {
    let stream = TradingStream::with_transport(
        test_stream_config(),
        ScriptedTransport::repeating(Vec::new()),
    );

    assert!(matches!(stream.stop(), Err(StreamError::SupervisorNotRunning)));
}

#[tokio::test]
async fn test_auth_failure_reconnects_instead_of_failing() {
    let transport = ScriptedTransport::repeating(vec![auth_reply("rejected")]);
    let logger = Arc::new(RecordingLogger::default());
    let stream = Arc::new(
        TradingStream::with_transport(test_stream_config(), transport.clone())
            .with_logger(logger.clone()),
    );
    let received = recording_handler(&stream);

    let run = spawn_run(&stream);
    assert!(wait_until(Duration::from_secs(2), || transport.connects() >= 2).await);

    assert!(transport.closes() >= 1);
    assert!(!run.is_finished());
    assert!(
        logger
            .warnings()
            .iter()
            .any(|warning| warning.contains("restarting connection"))
    );

    stop_and_join(&stream, run, Duration::from_secs(1)).await;
    assert_eq!(received_len(&received), 0);
    assert!(transport.sent_actions("listen").is_empty());
}

#[tokio::test]
async fn test_frames_dispatched_in_wire_order() {
    let transport = ScriptedTransport::new(|index| {
        (index == 0).then(|| {
            vec![
                auth_reply("authorized"),
                trade_update_frame(json!({
                    "event": "new",
                    "order": order_json(ORDER_1, "AAPL", "new"),
                    "timestamp": "2024-03-14T15:32:10.200000Z"
                })),
                trade_update_frame(json!({
                    "event": "partial_fill",
                    "order": order_json(ORDER_2, "MSFT", "partially_filled"),
                    "timestamp": "2024-03-14T15:32:11.000000Z",
                    "price": "410.10",
                    "qty": "4"
                })),
                trade_update_frame(fill_update_json(ORDER_3)),
            ]
        })
    });
    let stream = Arc::new(TradingStream::with_transport(
        test_stream_config(),
        transport.clone(),
    ));
    let received = recording_handler(&stream);

    let run = spawn_run(&stream);
    assert!(wait_until(Duration::from_secs(2), || received_len(&received) == 3).await);
    stop_and_join(&stream, run, Duration::from_secs(1)).await;

    let received = received.lock().expect("lock");
    let events: Vec<(TradeEvent, String)> = received
        .iter()
        .map(|event| {
            let update = event.as_typed().expect("typed update");
            (update.event.clone(), update.order.id.to_string())
        })
        .collect();
    assert_eq!(
        events,
        vec![
            (TradeEvent::New, ORDER_1.to_string()),
            (TradeEvent::PartialFill, ORDER_2.to_string()),
            (TradeEvent::Fill, ORDER_3.to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unknown_stream_class_is_ignored() {
    let transport = ScriptedTransport::new(|index| {
        (index == 0).then(|| {
            vec![
                auth_reply("authorized"),
                json!({"stream": "unknown_stream", "data": {"event": "fill"}}).to_string(),
                trade_update_frame(fill_update_json(ORDER_1)),
            ]
        })
    });
    let logger = Arc::new(RecordingLogger::default());
    let stream = Arc::new(
        TradingStream::with_transport(test_stream_config(), transport.clone())
            .with_logger(logger.clone()),
    );
    let received = recording_handler(&stream);

    let run = spawn_run(&stream);
    assert!(wait_until(Duration::from_secs(2), || received_len(&received) == 1).await);
    stop_and_join(&stream, run, Duration::from_secs(1)).await;

    assert_eq!(received_len(&received), 1);
    assert_eq!(transport.connects(), 1);
    assert!(logger.warnings().is_empty());
}

#[tokio::test]
async fn test_frames_without_string_discriminator_keep_connection() {
    let transport = ScriptedTransport::new(|index| {
        (index == 0).then(|| {
            vec![
                auth_reply("authorized"),
                json!({"stream": 7, "data": {}}).to_string(),
                json!({"stream": null, "data": {"event": "fill"}}).to_string(),
                "[1,2,3]".to_string(),
                trade_update_frame(fill_update_json(ORDER_1)),
            ]
        })
    });
    let logger = Arc::new(RecordingLogger::default());
    let stream = Arc::new(
        TradingStream::with_transport(test_stream_config(), transport.clone())
            .with_logger(logger.clone()),
    );
    let received = recording_handler(&stream);

    let run = spawn_run(&stream);
    assert!(wait_until(Duration::from_secs(2), || received_len(&received) == 1).await);
    stop_and_join(&stream, run, Duration::from_secs(1)).await;

    assert_eq!(transport.connects(), 1);
    assert!(logger.warnings().is_empty());
    let received = received.lock().expect("lock");
    assert_eq!(
        received[0].as_typed().map(|update| update.event.clone()),
        Some(TradeEvent::Fill)
    );
}

#[tokio::test]
async fn test_raw_mode_passes_data_document() {
    let transport = ScriptedTransport::new(|index| {
        (index == 0).then(|| {
            vec![
                auth_reply("authorized"),
                r#"{"stream":"trade_updates","data":{"order":{"id":"x"}}}"#.to_string(),
            ]
        })
    });
    let stream = Arc::new(TradingStream::with_transport(
        test_stream_config().with_raw_data(true),
        transport.clone(),
    ));
    let received = recording_handler(&stream);

    let run = spawn_run(&stream);
    assert!(wait_until(Duration::from_secs(2), || received_len(&received) == 1).await);
    stop_and_join(&stream, run, Duration::from_secs(1)).await;

    let received = received.lock().expect("lock");
    assert_eq!(
        received.as_slice(),
        &[TradeUpdateEvent::Raw(json!({"order": {"id": "x"}}))]
    );
}

#[tokio::test]
async fn test_fill_update_then_stop_scenario() {
    let transport = ScriptedTransport::new(|index| {
        (index == 0).then(|| {
            vec![
                auth_reply("authorized"),
                trade_update_frame(fill_update_json(ORDER_1)),
            ]
        })
    });
    let stream = Arc::new(TradingStream::with_transport(
        test_stream_config(),
        transport.clone(),
    ));
    let received = recording_handler(&stream);

    let run = spawn_run(&stream);
    assert!(wait_until(Duration::from_secs(2), || received_len(&received) == 1).await);
    assert_eq!(stream.state(), SessionState::Streaming);
    assert!(stream.is_running());

    // Must finish within one bounded-wait cycle (5s) of the stop.
    stop_and_join(&stream, run, Duration::from_secs(5)).await;

    let received = received.lock().expect("lock");
    assert_eq!(received.len(), 1);
    let update = received[0].as_typed().expect("typed update");
    assert_eq!(update.event, TradeEvent::Fill);
    assert_eq!(update.order.id.to_string(), ORDER_1);
    assert_eq!(update.order.symbol, "AAPL");
    assert_eq!(update.order.side, OrderSide::Buy);
    assert_eq!(update.price, Some(Decimal::new(17245, 2)));
    assert_eq!(update.qty, Some(Decimal::from(10)));
    assert_eq!(update.position_qty, Some(Decimal::from(10)));

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    let auth: serde_json::Value = serde_json::from_str(&sent[0].1).expect("auth json");
    assert_eq!(
        auth,
        json!({
            "action": "authenticate",
            "data": {"key_id": "test-key-id", "secret_key": "test-secret-key"}
        })
    );
    let listen: serde_json::Value = serde_json::from_str(&sent[1].1).expect("listen json");
    assert_eq!(
        listen,
        json!({"action": "listen", "data": {"streams": ["trade_updates"]}})
    );
    assert_eq!(transport.connects(), 1);
    assert_eq!(transport.closes(), 1);
}

#[tokio::test]
async fn test_disconnect_and_malformed_frame_reconnect() {
    let transport = ScriptedTransport::new(|index| match index {
        0 => Some(vec![
            auth_reply("authorized"),
            trade_update_frame(fill_update_json(ORDER_1)),
            DISCONNECT.to_string(),
        ]),
        1 => Some(vec![auth_reply("authorized"), "not json".to_string()]),
        2 => None,
        _ => Some(vec![
            auth_reply("authorized"),
            trade_update_frame(fill_update_json(ORDER_2)),
        ]),
    });
    let logger = Arc::new(RecordingLogger::default());
    let stream = Arc::new(
        TradingStream::with_transport(test_stream_config(), transport.clone())
            .with_logger(logger.clone()),
    );
    let received = recording_handler(&stream);

    let run = spawn_run(&stream);
    assert!(wait_until(Duration::from_secs(2), || received_len(&received) == 2).await);
    stop_and_join(&stream, run, Duration::from_secs(1)).await;

    assert_eq!(transport.connects(), 4);
    assert_eq!(logger.warnings().len(), 3);
    let listens: Vec<usize> = transport
        .sent_actions("listen")
        .into_iter()
        .map(|(index, _)| index)
        .collect();
    assert_eq!(listens, vec![0, 1, 3]);
}

#[tokio::test]
async fn test_stop_while_waiting_for_auth_reply() {
    let transport = ScriptedTransport::repeating(Vec::new());
    let stream = Arc::new(TradingStream::with_transport(
        test_stream_config(),
        transport.clone(),
    ));
    let _received = recording_handler(&stream);

    let run = spawn_run(&stream);
    assert!(
        wait_until(Duration::from_secs(2), || stream.state()
            == SessionState::Authenticating)
        .await
    );

    stop_and_join(&stream, run, Duration::from_secs(1)).await;
    assert_eq!(transport.connects(), 1);
    assert_eq!(transport.closes(), 1);
    assert!(transport.sent_actions("listen").is_empty());
}

#[tokio::test]
async fn test_handler_registered_while_streaming_subscribes_live() {
    let transport = ScriptedTransport::repeating(vec![auth_reply("authorized")]);
    let stream = Arc::new(TradingStream::with_transport(
        test_stream_config(),
        transport.clone(),
    ));
    let first = recording_handler(&stream);

    let run = spawn_run(&stream);
    assert!(wait_until(Duration::from_secs(2), || stream.state() == SessionState::Streaming).await);

    let second = recording_handler(&stream);
    assert!(wait_until(Duration::from_secs(2), || transport.sent_actions("listen").len() == 2).await);

    transport.push_frame(trade_update_frame(fill_update_json(ORDER_1)));
    assert!(wait_until(Duration::from_secs(2), || received_len(&second) == 1).await);
    stop_and_join(&stream, run, Duration::from_secs(1)).await;

    assert_eq!(received_len(&first), 0);
    assert_eq!(transport.connects(), 1);
}

#[tokio::test]
async fn test_stop_after_finish_is_noop_and_run_again_rejected_while_running() {
    let transport = ScriptedTransport::repeating(vec![auth_reply("authorized")]);
    let stream = Arc::new(TradingStream::with_transport(
        test_stream_config(),
        transport.clone(),
    ));
    let _received = recording_handler(&stream);

    let run = spawn_run(&stream);
    assert!(wait_until(Duration::from_secs(2), || stream.state() == SessionState::Streaming).await);
    assert!(matches!(
        stream.run_forever().await,
        Err(StreamError::AlreadyRunning)
    ));

    stop_and_join(&stream, run, Duration::from_secs(1)).await;
    assert_ok!(stream.stop());
    assert_eq!(stream.state(), SessionState::Terminated);
}
