//! 调度器
//!
//! 调度器是事件队列的唯一消费者，由宿主按固定周期（设计值 50ms）调用
//! `tick()`。每次 tick 只处理 tick 开始时已在队列中的事件，样本按出队
//! 顺序写入历史，出队顺序即字节到达顺序。

use crate::assembler::LegacyTelemetryAssembler;
use crate::config::LinkConfig;
use crate::history::{DisplayRanges, Sample, TelemetryHistory};
use crate::queue::{EventReceiver, LinkEvent};
use pidtune_protocol::{AdapterChain, Record, Telemetry};
use std::fmt;
use std::time::Instant;
use tracing::{debug, trace};

/// 日志条目
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// 相对于调度器启动的秒数
    pub timestamp: f64,
    /// 来源类别（`response`、`log`、`status`、`error`、`echo`、`unrecognized`、`link`）
    pub kind: &'static str,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>8.2}] [{}] {}", self.timestamp, self.kind, self.message)
    }
}

/// 单次 tick 的处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// 处理的事件数
    pub processed: usize,
    /// 写入历史的样本数
    pub samples: usize,
    /// 追加的日志条目数
    pub log_entries: usize,
}

/// 遥测快照（供渲染）
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub latest: Option<Sample>,
    pub samples: Vec<Sample>,
    pub ranges: Option<DisplayRanges>,
}

/// 调度器
pub struct Dispatcher {
    events: EventReceiver,
    chain: AdapterChain,
    history: TelemetryHistory,
    assembler: LegacyTelemetryAssembler,
    ranges: Option<DisplayRanges>,
    time_window_secs: f64,
    status: String,
    log: Vec<LogEntry>,
    epoch: Instant,
}

impl Dispatcher {
    pub fn new(events: EventReceiver, config: &LinkConfig) -> Self {
        Self {
            events,
            chain: AdapterChain::default(),
            history: TelemetryHistory::new(config.history_capacity),
            assembler: LegacyTelemetryAssembler::new(),
            ranges: None,
            time_window_secs: config.time_window_secs,
            status: String::new(),
            log: Vec::new(),
            epoch: Instant::now(),
        }
    }

    /// 替换适配器链
    pub fn with_chain(mut self, chain: AdapterChain) -> Self {
        self.chain = chain;
        self
    }

    /// 处理 tick 开始时已在队列中的全部事件
    pub fn tick(&mut self) -> DispatchReport {
        let mut report = DispatchReport::default();
        let batch: Vec<LinkEvent> = self.events.drain_available().collect();
        for event in batch {
            report.processed += 1;
            self.apply(event, &mut report);
        }

        if report.samples > 0 {
            self.ranges = self.history.display_ranges(self.time_window_secs);
        }
        if report.processed > 0 {
            trace!(
                "Dispatched {} events ({} samples, {} log entries)",
                report.processed, report.samples, report.log_entries
            );
        }
        report
    }

    fn apply(&mut self, event: LinkEvent, report: &mut DispatchReport) {
        match event {
            LinkEvent::Frame(frame) => {
                let record = self.chain.parse(&frame);
                self.apply_record(record, report);
            },
            LinkEvent::Fault(message) => self.apply_record(Record::error(message), report),
            LinkEvent::Notice(message) => {
                self.status = message.clone();
                self.append_log("link", message, report);
            },
            LinkEvent::Closed(message) => {
                // 连接结束时提交未完成的旧版遥测组
                if let Some(telemetry) = self.assembler.flush() {
                    self.record_sample(telemetry, report);
                }
                self.status = message.clone();
                self.append_log("link", message, report);
            },
        }
    }

    fn apply_record(&mut self, record: Record, report: &mut DispatchReport) {
        let kind = record.kind();
        match record {
            Record::Telemetry(telemetry) => self.record_sample(telemetry, report),
            Record::TelemetryField { field, value } => {
                if let Some(telemetry) = self.assembler.push(field, value) {
                    self.record_sample(telemetry, report);
                }
            },
            Record::Response { status, message } => {
                let prefix = if status.is_success() { "ok" } else { "error" };
                self.status = format!("{prefix}: {message}");
                self.append_log(kind, format!("{prefix}: {message}"), report);
            },
            Record::Log { message } | Record::Status { message } => {
                self.status = message.clone();
                self.append_log(kind, message, report);
            },
            Record::Error { message } => {
                self.status = format!("error: {message}");
                self.append_log(kind, message, report);
            },
            Record::Echo(command) => self.append_log(kind, command.to_string(), report),
            Record::Unrecognized { raw } => {
                debug!("Unrecognized frame: {}", raw);
                self.append_log(kind, raw, report);
            },
        }
    }

    fn record_sample(&mut self, telemetry: Telemetry, report: &mut DispatchReport) {
        let timestamp = self.elapsed_secs();
        self.history.push(timestamp, telemetry);
        report.samples += 1;
    }

    fn append_log(&mut self, kind: &'static str, message: String, report: &mut DispatchReport) {
        self.log.push(LogEntry {
            timestamp: self.elapsed_secs(),
            kind,
            message,
        });
        report.log_entries += 1;
    }

    fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// 最近一条状态消息
    pub fn status(&self) -> &str {
        &self.status
    }

    /// 日志（只追加）
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// 第 `from` 条之后的日志（用于增量输出）
    pub fn log_since(&self, from: usize) -> &[LogEntry] {
        self.log.get(from..).unwrap_or_default()
    }

    pub fn history(&self) -> &TelemetryHistory {
        &self.history
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.history.latest()
    }

    pub fn display_ranges(&self) -> Option<DisplayRanges> {
        self.ranges
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            latest: self.history.latest().copied(),
            samples: self.history.to_vec(),
            ranges: self.ranges,
        }
    }

    /// 清空遥测历史并重置时间原点（日志保留）
    pub fn clear_history(&mut self) {
        self.epoch = Instant::now();
        self.history.clear();
        self.ranges = None;
        self.assembler = LegacyTelemetryAssembler::new();
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("adapters", &self.chain.names())
            .field("history_len", &self.history.len())
            .field("log_len", &self.log.len())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::event_queue;

    fn dispatcher() -> (crate::queue::EventSender, Dispatcher) {
        let (tx, rx) = event_queue();
        (tx, Dispatcher::new(rx, &LinkConfig::default()))
    }

    #[test]
    fn test_samples_in_queue_order() {
        let (tx, mut dispatcher) = dispatcher();
        for rpm in [10, 20, 30] {
            tx.frame(format!(
                r#"{{"type":"data","target_rpm":100,"current_rpm":{rpm},"error":0,"motor_output":5}}"#
            ));
        }

        let report = dispatcher.tick();
        assert_eq!(report.processed, 3);
        assert_eq!(report.samples, 3);
        let currents: Vec<f64> = dispatcher
            .history()
            .iter()
            .map(|s| s.telemetry.current_rpm)
            .collect();
        assert_eq!(currents, vec![10.0, 20.0, 30.0]);
        assert!(dispatcher.display_ranges().is_some());
    }

    #[test]
    fn test_legacy_lines_are_assembled() {
        let (tx, mut dispatcher) = dispatcher();
        for line in [">target_rpm:500", ">current_rpm:480.5", ">motor_output:33", ">status:RUN"] {
            tx.frame(line);
        }
        let report = dispatcher.tick();
        assert_eq!(report.samples, 1);
        let latest = dispatcher.latest().unwrap().telemetry;
        assert_eq!(latest.target_rpm, 500.0);
        assert_eq!(latest.current_rpm, 480.5);
        assert_eq!(latest.motor_output, 33.0);
        assert_eq!(dispatcher.status(), "RUN");
    }

    #[test]
    fn test_status_slot_and_log() {
        let (tx, mut dispatcher) = dispatcher();
        tx.frame(r#"{"type":"response","status":"success","message":"PID updated"}"#);
        dispatcher.tick();
        assert_eq!(dispatcher.status(), "ok: PID updated");

        tx.frame(r#"{"type":"response","status":"nope","message":"bad value"}"#);
        tx.fault("read error: unplugged");
        dispatcher.tick();
        assert_eq!(dispatcher.status(), "error: read error: unplugged");

        let kinds: Vec<&str> = dispatcher.log().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec!["response", "response", "error"]);
        assert_eq!(dispatcher.log()[1].message, "error: bad value");
        assert_eq!(dispatcher.log_since(2).len(), 1);
        assert!(dispatcher.log_since(10).is_empty());
    }

    #[test]
    fn test_unknown_and_garbage_frames_are_logged() {
        let (tx, mut dispatcher) = dispatcher();
        tx.frame(r#"{"type":"telemetry2"}"#);
        tx.frame("hello");
        tx.notice("connected to mock");
        let report = dispatcher.tick();
        assert_eq!(report.samples, 0);
        assert_eq!(report.log_entries, 3);
        assert_eq!(dispatcher.log()[0].kind, "unrecognized");
        assert_eq!(dispatcher.log()[2].kind, "link");
        assert_eq!(dispatcher.status(), "connected to mock");
    }

    #[test]
    fn test_closed_link_commits_partial_legacy_group() {
        let (tx, mut dispatcher) = dispatcher();
        tx.frame(">target_rpm:700");
        tx.frame(">current_rpm:650");
        assert_eq!(dispatcher.tick().samples, 0);

        tx.closed("disconnected from mock");
        let report = dispatcher.tick();
        assert_eq!(report.samples, 1);
        let latest = dispatcher.latest().unwrap().telemetry;
        assert_eq!(latest.target_rpm, 700.0);
        assert_eq!(latest.current_rpm, 650.0);
        assert_eq!(latest.motor_output, 0.0);
        assert_eq!(dispatcher.status(), "disconnected from mock");
        assert_eq!(dispatcher.log().last().unwrap().kind, "link");

        // 已提交的组不会在下一次关闭时重复提交
        tx.closed("disconnected from mock");
        assert_eq!(dispatcher.tick().samples, 0);
    }

    #[test]
    fn test_tick_is_bounded_by_queue_length() {
        let (tx, mut dispatcher) = dispatcher();
        tx.frame(">status:a");
        tx.frame(">status:b");
        assert_eq!(dispatcher.tick().processed, 2);
        assert_eq!(dispatcher.tick().processed, 0);
    }

    #[test]
    fn test_clear_history() {
        let (tx, mut dispatcher) = dispatcher();
        tx.frame(r#"{"type":"data","current_rpm":1}"#);
        tx.frame(">log:kept");
        dispatcher.tick();
        dispatcher.clear_history();
        let snapshot = dispatcher.snapshot();
        assert!(snapshot.latest.is_none());
        assert!(snapshot.samples.is_empty());
        assert!(snapshot.ranges.is_none());
        assert_eq!(dispatcher.log().len(), 1);
    }

    #[test]
    fn test_log_entry_display() {
        let entry = LogEntry {
            timestamp: 1.5,
            kind: "status",
            message: "RUN".into(),
        };
        assert_eq!(entry.to_string(), "[    1.50] [status] RUN");
    }
}
