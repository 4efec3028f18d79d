//! Integration tests for the HP 8562E session against the mock analyzer and a
//! scripted device on the far end of a duplex stream.
//!
//! These tests check what goes over the wire: command order, the one
//! `++read eoi` per reply rule, restoration on close, and transport release on
//! every exit path.

use daq_core::serial::SerialTransport;
use daq_driver_hp8562e::mock::MockSettings;
use daq_driver_hp8562e::{
    Hp8562eError, Hp8562eSession, MockAnalyzer, QueryBatch, QueryField, SweepMode, SweepRequest,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

const TIMEOUT: Duration = Duration::from_millis(50);

const PARAMETER_QUERY: &str = "FA?;FB?;RL?;RB?;VB?;ST?;LG?;AUNITS?;";

fn reference_settings() -> MockSettings {
    MockSettings {
        start_frequency: 100.0,
        stop_frequency: 200.0,
        reference_level: -10.0,
        resolution_bandwidth: 1.0,
        video_bandwidth: 1.0,
        sweep_time: 0.05,
        log_scale: 10.0,
        ..MockSettings::default()
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn open_then_close_writes_exactly_three_commands() {
    let mock = MockAnalyzer::default();
    let handle = mock.handle();

    let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();
    session.close().await;

    assert_eq!(handle.writes(), vec!["++auto 0", "SNGLS", "CONTS"]);
    assert!(handle.is_released());
}

#[tokio::test]
async fn open_failure_releases_transport() {
    // "++auto 0" succeeds, "SNGLS" fails
    let mock = MockAnalyzer::default().fail_writes_from(1);
    let handle = mock.handle();

    match Hp8562eSession::open(mock, TIMEOUT).await {
        Err(Hp8562eError::TransportIo(_)) => {}
        Err(other) => panic!("expected TransportIo, got {other:?}"),
        Ok(_) => panic!("open should fail"),
    }
    assert_eq!(handle.writes(), vec!["++auto 0"]);
    assert!(handle.is_released());
}

#[tokio::test]
async fn close_releases_even_when_restore_fails() {
    let mock = MockAnalyzer::default().fail_writes_from(2);
    let handle = mock.handle();

    let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();
    session.close().await;

    assert_eq!(handle.writes(), vec!["++auto 0", "SNGLS"]);
    assert!(handle.is_released());
}

#[tokio::test]
async fn stale_input_is_flushed_on_open() {
    let mock = MockAnalyzer::default()
        .with_settings(reference_settings())
        .with_stale_line("-99.00\r\n");
    let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();

    let params = session.trace_parameters().await.unwrap();
    assert_eq!(params.start_frequency, 100.0);

    session.close().await;
}

// =============================================================================
// Transactions
// =============================================================================

#[tokio::test]
async fn acquire_issues_one_read_per_reply() {
    let mock = MockAnalyzer::default()
        .with_settings(reference_settings())
        .with_trace(vec![600.0, 660.0, 540.0]);
    let handle = mock.handle();
    let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();

    let trace = session.acquire().await.unwrap();

    assert_eq!(trace.power(), &[-10.0, 0.0, -20.0]);
    assert_eq!(trace.units(), "DBM");
    let expected = [100.0, 100.0 + 100.0 / 3.0, 100.0 + 200.0 / 3.0];
    for (got, want) in trace.frequency().iter().zip(expected) {
        assert!((got - want).abs() < 1e-9, "{got} != {want}");
    }

    assert_eq!(
        handle.commands(),
        vec!["++auto 0", "SNGLS", PARAMETER_QUERY, "TS; TDF M; TRA?"]
    );
    let reads = handle
        .writes()
        .iter()
        .filter(|w| w.as_str() == "++read eoi")
        .count();
    assert_eq!(reads, 9);

    session.close().await;
}

#[tokio::test]
async fn short_reply_stream_times_out_then_desynchronizes() {
    let mock = MockAnalyzer::default().with_reply_limit(5);
    let handle = mock.handle();
    let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();

    let err = session.trace_parameters().await.unwrap_err();
    match &err {
        Hp8562eError::TransportTimeout { awaiting, .. } => assert_eq!(awaiting, "ST?"),
        other => panic!("expected TransportTimeout, got {other:?}"),
    }

    let err = session
        .query(&QueryBatch::new([QueryField::ReferenceLevel]))
        .await
        .unwrap_err();
    assert!(matches!(err, Hp8562eError::Desynchronized));

    session.close().await;
    assert!(handle.is_released());
}

#[tokio::test]
async fn query_returns_raw_replies_in_order() {
    let mock = MockAnalyzer::default().with_settings(reference_settings());
    let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();

    let batch = QueryBatch::new([QueryField::AmplitudeUnits, QueryField::ReferenceLevel]);
    let replies = session.query(&batch).await.unwrap();
    assert_eq!(replies, vec!["DBM\r\n", "-10.00\r\n"]);

    session.close().await;
}

#[tokio::test]
async fn configure_sweep_changes_reported_span() {
    let mock = MockAnalyzer::default();
    let handle = mock.handle();
    let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();

    let request = SweepRequest::new(1_000_000, 2_000_000, 3_000).unwrap();
    session.configure_sweep(&request).await.unwrap();
    assert!(handle
        .commands()
        .contains(&"FA 1000000; FB 2000000; RB 3000".to_string()));

    let params = session.trace_parameters().await.unwrap();
    assert_eq!(params.start_frequency, 1.0e6);
    assert_eq!(params.stop_frequency, 2.0e6);
    assert_eq!(params.resolution_bandwidth, 3.0e3);

    session.close().await;
}

#[tokio::test]
async fn sweep_mode_can_be_switched_explicitly() {
    let mock = MockAnalyzer::default();
    let handle = mock.handle();
    let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();

    session.set_sweep_mode(SweepMode::Continuous).await.unwrap();
    session.set_sweep_mode(SweepMode::Single).await.unwrap();
    session.close().await;

    assert_eq!(
        handle.writes(),
        vec!["++auto 0", "SNGLS", "CONTS", "SNGLS", "CONTS"]
    );
}

#[tokio::test]
async fn concurrent_acquisitions_are_serialized() {
    let mock = MockAnalyzer::new(31);
    let handle = mock.handle();
    let session = Hp8562eSession::open(mock, TIMEOUT).await.unwrap();

    let (a, b) = tokio::join!(session.acquire(), session.acquire());
    assert_eq!(a.unwrap().len(), 31);
    assert_eq!(b.unwrap().len(), 31);
    assert_eq!(handle.sweeps(), 2);

    session.close().await;
}

// =============================================================================
// Serial transport
// =============================================================================

/// Plays the bridge: logs every line and answers each `++read eoi` with the
/// next scripted reply. Returns the log once the host side closes.
async fn scripted_bridge(stream: DuplexStream, replies: Vec<&'static str>) -> Vec<String> {
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();
    let mut replies = replies.into_iter();
    let mut log = Vec::new();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end_matches('\r').to_string();
        if line == "++read eoi" {
            if let Some(reply) = replies.next() {
                writer.write_all(reply.as_bytes()).await.unwrap();
            }
        }
        log.push(line);
    }
    log
}

#[tokio::test]
async fn parameters_over_serial_transport() {
    let (host, device) = tokio::io::duplex(1024);
    let bridge = tokio::spawn(scripted_bridge(
        device,
        vec![
            "100.0\n", "200.0\n", "-10.0\n", "1.0\n", "1.0\n", "0.05\n", "10.0\n", "DBM\r\n",
        ],
    ));

    let session = Hp8562eSession::open(SerialTransport::new(host), Duration::from_secs(2))
        .await
        .unwrap();
    let params = session.trace_parameters().await.unwrap();
    session.close().await;

    assert_eq!(params.start_frequency, 100.0);
    assert_eq!(params.stop_frequency, 200.0);
    assert_eq!(params.reference_level, -10.0);
    assert_eq!(params.units, "DBM");

    let log = bridge.await.unwrap();
    let mut expected = vec!["++auto 0".to_string(), "SNGLS".into(), PARAMETER_QUERY.into()];
    expected.extend(std::iter::repeat("++read eoi".to_string()).take(8));
    expected.push("CONTS".into());
    assert_eq!(log, expected);
}

#[tokio::test]
async fn trace_garbage_over_serial_is_malformed() {
    let (host, device) = tokio::io::duplex(1024);
    let bridge = tokio::spawn(scripted_bridge(device, vec!["600,ERR,540\r\n"]));

    let session = Hp8562eSession::open(SerialTransport::new(host), Duration::from_secs(2))
        .await
        .unwrap();
    let err = session.fetch_raw_trace().await.unwrap_err();
    assert!(matches!(err, Hp8562eError::MalformedResponse { .. }));
    assert!(!session.is_desynchronized().await);
    session.close().await;

    let log = bridge.await.unwrap();
    assert_eq!(log.last().map(String::as_str), Some("CONTS"));
}
