//! 控制台会话
//!
//! 打开串口链路，按固定周期驱动调度器，并把新增日志和最新样本打印到终端。
//! 所有命令共用这一层，命令本身只负责下发意图。

use crate::commands::PortArgs;
use crate::config::AppConfig;
use anyhow::{Context, Result};
use pidtune_link::{
    CancellationToken, CommandSender, Dispatcher, EventSender, LinkSession, event_queue,
};
use pidtune_protocol::PidGains;
use pidtune_serial::SerialTransport;
use std::time::{Duration, Instant};
use tracing::debug;

/// 调度器 tick 周期
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// 最新样本打印间隔
const SAMPLE_PRINT_INTERVAL: Duration = Duration::from_secs(1);

/// 控制台会话
pub struct Console {
    session: LinkSession,
    dispatcher: Dispatcher,
    events: EventSender,
    /// 已打印的日志条数
    printed: usize,
    last_sample_print: Option<Instant>,
    stop: CancellationToken,
}

impl Console {
    /// 连接串口
    ///
    /// `stop` 为进程级停止令牌（Ctrl-C 时取消）。
    pub fn open(
        config: &AppConfig,
        port: &PortArgs,
        gains: PidGains,
        stop: CancellationToken,
    ) -> Result<Self> {
        let serial = port.resolve(&config.serial);
        let (tx, rx) = event_queue();
        let dispatcher = Dispatcher::new(rx, &config.link);
        let mut session = LinkSession::with_gains(config.link.clone(), tx.clone(), gains);

        println!("🔌 连接到 {} ({} baud)...", serial.port, serial.baud_rate);
        let label = serial.port.clone();
        session
            .connect(&label, || SerialTransport::open(&serial))
            .with_context(|| format!("无法打开串口 {}", serial.port))?;
        println!("✅ 已连接");

        Ok(Self {
            session,
            dispatcher,
            events: tx,
            printed: 0,
            last_sample_print: None,
            stop,
        })
    }

    pub fn commander(&self) -> CommandSender {
        self.session.commander()
    }

    /// 事件队列发送端（本地通知与链路事件同序显示）
    pub fn notices(&self) -> EventSender {
        self.events.clone()
    }

    pub fn session(&self) -> &LinkSession {
        &self.session
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// 执行一次调度并打印新内容
    pub fn tick(&mut self) {
        let report = self.dispatcher.tick();
        if report.processed > 0 {
            debug!(
                "tick: {} events, {} samples, {} log entries",
                report.processed, report.samples, report.log_entries
            );
        }

        for entry in self.dispatcher.log_since(self.printed) {
            println!("{entry}");
        }
        self.printed = self.dispatcher.log().len();

        if report.samples > 0
            && self
                .last_sample_print
                .is_none_or(|at| at.elapsed() >= SAMPLE_PRINT_INTERVAL)
        {
            self.print_latest();
            self.last_sample_print = Some(Instant::now());
        }
    }

    /// 打印最新样本
    pub fn print_latest(&self) {
        if let Some(sample) = self.dispatcher.latest() {
            let t = sample.telemetry;
            println!(
                "📊 t={:>7.2}s  target={:>8.1}  current={:>8.1}  error={:>8.1}  output={:>8.1}",
                sample.timestamp, t.target_rpm, t.current_rpm, t.error, t.motor_output
            );
        }
    }

    /// 持续 tick，直到 `done` 返回 true、收到停止信号或超过 `limit`
    ///
    /// 返回 true 表示因停止信号退出。
    pub fn run_until(&mut self, limit: Option<Duration>, mut done: impl FnMut() -> bool) -> bool {
        let started = Instant::now();
        loop {
            self.tick();
            if self.is_stopped() {
                return true;
            }
            if done() || limit.is_some_and(|limit| started.elapsed() >= limit) {
                return false;
            }
            spin_sleep::sleep(TICK_INTERVAL);
        }
    }

    /// 断开连接并打印剩余内容
    pub fn close(mut self) {
        self.session.disconnect();
        self.tick();

        let metrics = self.session.metrics();
        println!(
            "📈 读取 {} 字节, {} 帧, {} 个读取错误, 发送 {} 条命令",
            metrics.bytes_read,
            metrics.frames_queued,
            metrics.read_faults(),
            metrics.commands_sent
        );
        let status = self.dispatcher.status();
        if !status.is_empty() {
            println!("状态: {status}");
        }
    }
}
