//! 链路端到端测试
//!
//! 验证完整读路径的核心保证：
//! 1. 字节任意切分时，样本按到达顺序进入历史
//! 2. 读取故障只产生错误记录，读取线程继续运行
//! 3. 断开连接先停止读取线程再关闭传输，之后的发送不触碰传输

use pidtune_link::{
    ConnectionState, Dispatcher, LinkConfig, LinkSession, SendOutcome, event_queue,
};
use pidtune_protocol::{PidGains, WireFormat};
use pidtune_serial::MockTransport;
use std::thread;
use std::time::{Duration, Instant};

fn fast_config() -> LinkConfig {
    let mut config = LinkConfig::default();
    config.reader.poll_interval_ms = 1;
    config.reader.error_backoff_ms = 10;
    config
}

/// 周期性 tick 直到条件满足（模拟宿主的定时器）
fn tick_until(dispatcher: &mut Dispatcher, mut cond: impl FnMut(&Dispatcher) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        dispatcher.tick();
        if cond(dispatcher) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_fragmented_stream_preserves_order() {
    let config = fast_config();
    let (tx, rx) = event_queue();
    let mut session = LinkSession::new(config.clone(), tx);
    let mut dispatcher = Dispatcher::new(rx, &config);
    let mock = MockTransport::new();

    let mut stream = String::new();
    for i in 0..50 {
        stream.push_str(&format!(
            "{{\"type\":\"data\",\"target_rpm\":1000,\"current_rpm\":{i},\"error\":0,\"motor_output\":1}}\n"
        ));
    }
    // 以质数长度切块，块边界落在帧中间
    for chunk in stream.as_bytes().chunks(37) {
        mock.push_bytes(chunk.to_vec());
    }

    session.connect("mock", || Ok(mock.clone())).unwrap();
    assert!(tick_until(&mut dispatcher, |d| d.history().len() == 50));

    let currents: Vec<f64> = dispatcher
        .history()
        .iter()
        .map(|s| s.telemetry.current_rpm)
        .collect();
    let expected: Vec<f64> = (0..50).map(f64::from).collect();
    assert_eq!(currents, expected);

    let timestamps: Vec<f64> = dispatcher.history().iter().map(|s| s.timestamp).collect();
    assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(session.metrics().frames_queued, 50);
}

#[test]
fn test_read_faults_become_error_records() {
    let config = fast_config();
    let (tx, rx) = event_queue();
    let mut session = LinkSession::new(config.clone(), tx);
    let mut dispatcher = Dispatcher::new(rx, &config);
    let mock = MockTransport::new();

    mock.push_bytes(b">status:booting\n".to_vec());
    mock.push_fault("framing error");
    mock.push_bytes(b"\xff\xfe\n".to_vec());
    mock.push_bytes(b">target_rpm:300\n>current_rpm:290\n>motor_output:12\n".to_vec());

    session.connect("mock", || Ok(mock.clone())).unwrap();
    assert!(tick_until(&mut dispatcher, |d| d.history().len() == 1));
    assert!(session.is_connected());

    let errors: Vec<&str> = dispatcher
        .log()
        .iter()
        .filter(|e| e.kind == "error")
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("framing error"));
    assert!(errors[1].contains("UTF-8"));
    // 非法字节以替换字符解码后仍作为帧进入解析链
    assert!(
        dispatcher
            .log()
            .iter()
            .any(|e| e.kind == "unrecognized" && e.message == "\u{FFFD}\u{FFFD}")
    );

    let sample = dispatcher.latest().unwrap().telemetry;
    assert_eq!(sample.target_rpm, 300.0);
    assert_eq!(sample.current_rpm, 290.0);
}

#[test]
fn test_disconnect_then_send_is_noop() {
    let config = LinkConfig {
        wire_format: WireFormat::Legacy,
        ..fast_config()
    };
    let (tx, rx) = event_queue();
    let mut session = LinkSession::new(config.clone(), tx);
    let mut dispatcher = Dispatcher::new(rx, &config);
    let mock = MockTransport::new();

    session.connect("mock", || Ok(mock.clone())).unwrap();
    let commander = session.commander();
    let gains = PidGains::new(0.5, 0.2, 0.1).unwrap();
    assert_eq!(
        commander.send_all(gains, 1200, config.send_gap()).unwrap(),
        SendOutcome::Sent
    );
    assert_eq!(mock.written_text(), "PID:0.5,0.2,0.1\nRPM:1200\n");

    session.disconnect();
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(mock.is_closed());

    assert_eq!(commander.stop_motor().unwrap(), SendOutcome::NotConnected);
    assert_eq!(mock.written().len(), 2);

    dispatcher.tick();
    let notices: Vec<&str> = dispatcher
        .log()
        .iter()
        .filter(|e| e.kind == "link")
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(notices.len(), 3);
    assert!(notices[0].starts_with("connected"));
    assert!(notices[1].starts_with("disconnected"));
    assert!(notices[2].contains("not connected"));
}

#[test]
fn test_echoed_command_round_trip() {
    let config = fast_config();
    let (tx, rx) = event_queue();
    let mut session = LinkSession::new(config.clone(), tx);
    let mut dispatcher = Dispatcher::new(rx, &config);
    let mock = MockTransport::new();

    session.connect("mock", || Ok(mock.clone())).unwrap();
    session
        .commander()
        .set_gains(PidGains::new(0.5, 0.2, 0.1).unwrap())
        .unwrap();

    // 设备原样回显
    mock.push_bytes(mock.written_text().into_bytes());
    assert!(tick_until(&mut dispatcher, |d| {
        d.log().iter().any(|e| e.kind == "echo")
    }));

    let echo = dispatcher.log().iter().find(|e| e.kind == "echo").unwrap();
    assert_eq!(echo.message, "set_pid Kp=0.50, Ki=0.20, Kd=0.10");
}

#[test]
fn test_disconnect_commits_trailing_legacy_group() {
    let config = fast_config();
    let (tx, rx) = event_queue();
    let mut session = LinkSession::new(config.clone(), tx);
    let mut dispatcher = Dispatcher::new(rx, &config);
    let mock = MockTransport::new();

    // 最后一组缺少电机输出字段
    mock.push_bytes(b">target_rpm:300\n>current_rpm:280\n".to_vec());
    session.connect("mock", || Ok(mock.clone())).unwrap();
    assert!(tick_until(&mut dispatcher, |_| session.metrics().frames_queued == 2));
    assert!(dispatcher.history().is_empty());

    session.disconnect();
    dispatcher.tick();

    assert_eq!(dispatcher.history().len(), 1);
    let sample = dispatcher.latest().unwrap().telemetry;
    assert_eq!(sample.target_rpm, 300.0);
    assert_eq!(sample.current_rpm, 280.0);
    assert_eq!(dispatcher.status(), "disconnected from mock");
}
