mod harness;

use arbiter_core::domain::Command;
use arbiter_core::foundation::constants::MAX_WIRE_LINE_BYTES;
use arbiter_core::foundation::AppId;
use arbiter_core::infrastructure::audit::RecordingAuditLogger;
use arbiter_core::infrastructure::config::AppConfig;
use arbiter_core::infrastructure::directory::{PriorityDirectory, TcpDirectory};
use arbiter_core::infrastructure::transport::{CommandSink, IntentSource};
use arbiter_service::service::arbitration::run_arbitration_loop;
use arbiter_service::service::flow::ServiceFlow;
use arbiter_service::transport::{TcpCommandSink, TcpIntentSource};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

const WAIT: Duration = Duration::from_secs(5);

fn sample_command(id: &str) -> Command {
    Command {
        intent_id: id.into(),
        app_id: "APP1".into(),
        target_node: "N001".into(),
        param: "mode".into(),
        value: json!("eco"),
        resolved_by: "conflict_manager".to_string(),
        ts: 42.0,
    }
}

#[tokio::test]
async fn source_parses_one_intent_per_line() {
    let source = TcpIntentSource::bind("127.0.0.1:0").await.unwrap();
    let addr = source.local_addr();
    let mut subscription = source.subscribe().await.unwrap();

    let mut producer = TcpStream::connect(addr).await.unwrap();
    producer
        .write_all(b"{\"intent_id\":\"cmd-1\",\"app_id\":\"APP1\",\"target_node\":\"N001\",\"param\":\"mode\",\"value\":\"eco\"}\n")
        .await
        .unwrap();
    producer.write_all(b"not json at all\n").await.unwrap();
    producer.write_all(b"\n").await.unwrap();
    producer.write_all(b"{\"intent_id\":\"cmd-2\",\"target_node\":\"N001\",\"param\":\"rate\",\"value\":40}\n").await.unwrap();

    let first = tokio::time::timeout(WAIT, subscription.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(first.intent_id.as_deref(), Some("cmd-1"));
    assert_eq!(first.value, json!("eco"));

    // The garbage and blank lines are dropped, not surfaced as errors.
    let second = tokio::time::timeout(WAIT, subscription.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(second.intent_id.as_deref(), Some("cmd-2"));
    assert_eq!(second.value, json!(40));
}

#[tokio::test]
async fn source_allows_only_one_subscriber() {
    let source = TcpIntentSource::bind("127.0.0.1:0").await.unwrap();
    let _subscription = source.subscribe().await.unwrap();
    assert!(source.subscribe().await.is_err());
}

#[tokio::test]
async fn oversized_line_closes_the_connection() {
    let source = TcpIntentSource::bind("127.0.0.1:0").await.unwrap();
    let addr = source.local_addr();
    let mut subscription = source.subscribe().await.unwrap();

    let mut flood = TcpStream::connect(addr).await.unwrap();
    let oversized = vec![b'x'; MAX_WIRE_LINE_BYTES + 2];
    flood.write_all(&oversized).await.unwrap();

    // The flooding connection is dropped by the listener.
    let mut scratch = [0u8; 16];
    let closed = tokio::time::timeout(WAIT, flood.read(&mut scratch)).await.unwrap();
    assert!(matches!(closed, Ok(0) | Err(_)));

    // A fresh connection is unaffected.
    let mut healthy = TcpStream::connect(addr).await.unwrap();
    healthy
        .write_all(b"{\"intent_id\":\"cmd-ok\",\"target_node\":\"N001\",\"param\":\"mode\",\"value\":\"eco\"}\n")
        .await
        .unwrap();
    let draft = tokio::time::timeout(WAIT, subscription.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(draft.intent_id.as_deref(), Some("cmd-ok"));
}

#[tokio::test]
async fn sink_reuses_one_connection_across_forwards() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let sink = TcpCommandSink::new(addr.to_string());

    sink.forward(&sample_command("cmd-1")).await.unwrap();
    let (stream, _) = tokio::time::timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    let mut reader = BufReader::new(stream);

    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let wire: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(wire["intent_id"], "cmd-1");
    assert_eq!(wire["resolved_by"], "conflict_manager");
    assert_eq!(wire["ts"], json!(42.0));

    // The second forward arrives on the same accepted connection.
    sink.forward(&sample_command("cmd-2")).await.unwrap();
    let mut line = String::new();
    tokio::time::timeout(WAIT, reader.read_line(&mut line)).await.unwrap().unwrap();
    let wire: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(wire["intent_id"], "cmd-2");
}

#[tokio::test]
async fn sink_errors_without_listener_then_recovers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sink = TcpCommandSink::new(addr.to_string());
    assert!(sink.forward(&sample_command("cmd-1")).await.is_err());

    let listener = TcpListener::bind(addr).await.unwrap();
    sink.forward(&sample_command("cmd-2")).await.unwrap();
    let (stream, _) = tokio::time::timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let wire: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(wire["intent_id"], "cmd-2");
}

#[tokio::test]
async fn directory_lookup_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { break };
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut reader = BufReader::new(read_half);
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                    return;
                }
                let request: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
                assert_eq!(request["type"], "GET_APP_PRIORITY");
                let reply = if request["app_id"] == "APP7" {
                    json!({"status": "OK", "app_id": "APP7", "priority": 70})
                } else {
                    json!({"status": "ERROR", "error": "unknown app"})
                };
                let mut wire = reply.to_string();
                wire.push('\n');
                let _ = write_half.write_all(wire.as_bytes()).await;
            });
        }
    });

    let directory = TcpDirectory::new(addr.to_string());
    assert_eq!(directory.app_priority(&AppId::from("APP7")).await.unwrap(), Some(70));
    assert_eq!(directory.app_priority(&AppId::from("APP0")).await.unwrap(), None);
}

#[tokio::test]
async fn conflicting_producers_resolve_over_tcp() {
    let downstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let downstream_addr = downstream.local_addr().unwrap();

    let mut config = AppConfig::default();
    config.arbitration.collection_window_ms = 50;
    config.egress.forward_addr = downstream_addr.to_string();

    let audit = RecordingAuditLogger::new();
    let sink: Arc<dyn CommandSink> = Arc::new(TcpCommandSink::new(downstream_addr.to_string()));
    let (flow, fired_rx) = ServiceFlow::new(&config, Arc::new(audit.clone()), None, sink).unwrap();
    let flow = Arc::new(flow);

    let source = Arc::new(TcpIntentSource::bind("127.0.0.1:0").await.unwrap());
    let ingress_addr = source.local_addr();
    tokio::spawn(run_arbitration_loop(Arc::new(config), flow, source, fired_rx));

    let mut producer = TcpStream::connect(ingress_addr).await.unwrap();
    for line in [
        "{\"intent_id\":\"cmd-a\",\"app_id\":\"APP1\",\"target_node\":\"N001\",\"param\":\"tx_power\",\"value\":20,\"priority\":100}",
        "{\"intent_id\":\"cmd-b\",\"app_id\":\"APP2\",\"target_node\":\"N001\",\"param\":\"tx_power\",\"value\":17,\"priority\":80}",
    ] {
        producer.write_all(line.as_bytes()).await.unwrap();
        producer.write_all(b"\n").await.unwrap();
    }

    let (stream, _) = tokio::time::timeout(WAIT, downstream.accept()).await.unwrap().unwrap();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    tokio::time::timeout(WAIT, reader.read_line(&mut line)).await.unwrap().unwrap();
    let command: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(command["intent_id"], "cmd-a");
    assert_eq!(command["app_id"], "APP1");
    assert_eq!(command["value"], json!(20));
    assert_eq!(command["resolved_by"], "conflict_manager");

    assert!(harness::wait_until(WAIT, || audit.events().len() == 1).await);
}
