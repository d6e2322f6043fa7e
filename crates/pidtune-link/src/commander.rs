//! 命令发送
//!
//! `CommandSender` 可克隆，界面线程与扫描线程各持一份。连接检查与写入
//! 在同一把写端锁内完成，断开连接（取走写端）与发送不会交错。

use crate::error::LinkError;
use crate::metrics::LinkMetrics;
use crate::queue::EventSender;
use crate::state::AtomicConnectionState;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use pidtune_protocol::{Command, PidGains, WireFormat};
use pidtune_serial::TransportWriter;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, warn};

/// 写端槽位：连接期间为 `Some`，断开时被取走并关闭
pub(crate) type WriterSlot = Arc<Mutex<Option<Box<dyn TransportWriter>>>>;

/// 发送结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// 已写入传输（不代表设备已执行）
    Sent,
    /// 未连接，命令被跳过
    NotConnected,
}

impl SendOutcome {
    pub fn is_sent(self) -> bool {
        self == SendOutcome::Sent
    }
}

/// 命令发送器
#[derive(Clone)]
pub struct CommandSender {
    writer: WriterSlot,
    state: Arc<AtomicConnectionState>,
    events: EventSender,
    gains: Arc<ArcSwap<PidGains>>,
    format: WireFormat,
    metrics: Arc<LinkMetrics>,
}

impl CommandSender {
    pub(crate) fn new(
        writer: WriterSlot,
        state: Arc<AtomicConnectionState>,
        events: EventSender,
        gains: Arc<ArcSwap<PidGains>>,
        format: WireFormat,
        metrics: Arc<LinkMetrics>,
    ) -> Self {
        Self {
            writer,
            state,
            events,
            gains,
            format,
            metrics,
        }
    }

    pub fn wire_format(&self) -> WireFormat {
        self.format
    }

    pub fn is_connected(&self) -> bool {
        self.state.get(Ordering::Acquire).is_connected()
    }

    /// 发送一条命令（尽力而为，不等待设备确认）
    ///
    /// # 返回
    /// - `Ok(Sent)`: 已写入传输
    /// - `Ok(NotConnected)`: 未连接，不访问传输，并入队一条通知
    ///
    /// # 错误
    /// - `LinkError::Protocol`: 命令无法编码
    /// - `LinkError::Transport`: 写入失败（同时入队一条故障事件）
    pub fn send(&self, command: Command) -> Result<SendOutcome, LinkError> {
        let mut slot = self.writer.lock();
        let state = self.state.get(Ordering::Acquire);
        let writer = match slot.as_mut() {
            Some(writer) if state.is_connected() => writer,
            _ => {
                self.metrics.commands_skipped.fetch_add(1, Ordering::Relaxed);
                warn!("Not connected ({:?}), skipping {}", state, command);
                self.events
                    .notice(format!("not connected, cannot send {command}"));
                return Ok(SendOutcome::NotConnected);
            },
        };

        let bytes = command.encode(self.format)?;
        if let Err(e) = writer.write_all(&bytes) {
            self.metrics.write_faults.fetch_add(1, Ordering::Relaxed);
            warn!("Failed to send {}: {}", command, e);
            self.events.fault(format!("failed to send {command}: {e}"));
            return Err(e.into());
        }

        self.metrics.commands_sent.fetch_add(1, Ordering::Relaxed);
        debug!("Sent {}", command);
        Ok(SendOutcome::Sent)
    }

    /// 当前 PID 参数集
    pub fn gains(&self) -> PidGains {
        **self.gains.load()
    }

    /// 更新 PID 参数集（不发送）
    pub fn store_gains(&self, gains: PidGains) {
        self.gains.store(Arc::new(gains));
    }

    /// 发送当前 PID 参数集
    pub fn send_gains(&self) -> Result<SendOutcome, LinkError> {
        self.send(Command::set_pid(self.gains()))
    }

    /// 更新并发送 PID 参数集
    pub fn set_gains(&self, gains: PidGains) -> Result<SendOutcome, LinkError> {
        self.store_gains(gains);
        self.send_gains()
    }

    pub fn set_target(&self, rpm: i32) -> Result<SendOutcome, LinkError> {
        self.send(Command::set_target(rpm))
    }

    /// 停止电机（目标转速置 0）
    pub fn stop_motor(&self) -> Result<SendOutcome, LinkError> {
        self.set_target(0)
    }

    /// 先发送 PID，间隔 `gap` 后发送目标转速
    ///
    /// PID 未能发送时不再发送目标转速。
    pub fn send_all(
        &self,
        gains: PidGains,
        rpm: i32,
        gap: Duration,
    ) -> Result<SendOutcome, LinkError> {
        if !self.set_gains(gains)?.is_sent() {
            return Ok(SendOutcome::NotConnected);
        }
        spin_sleep::sleep(gap);
        self.set_target(rpm)
    }
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender")
            .field("state", &self.state.get(Ordering::Relaxed))
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
