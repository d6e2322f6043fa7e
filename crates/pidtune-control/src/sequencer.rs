//! 扫描序列器
//!
//! 扫描在独立线程中运行：先下发当前 PID 参数集，再逐个下发目标转速，
//! 每步之后分片等待。取消令牌在每次下发前和每个等待分片中检查，
//! 取消后不再下发任何命令，也不回退已下发的目标。

use crate::error::SweepError;
use crate::plan::SweepPlan;
use crossbeam_channel::{Receiver, Sender, unbounded};
use pidtune_link::{CancellationToken, CommandSender, EventSender, SendOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

/// 扫描配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// 等待分片（毫秒），取消请求最迟在一个分片内生效
    pub wait_slice_ms: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { wait_slice_ms: 100 }
    }
}

impl SweepConfig {
    pub fn wait_slice(&self) -> Duration {
        Duration::from_millis(self.wait_slice_ms)
    }
}

/// 扫描状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SweepState {
    /// 空闲（默认）
    #[default]
    Idle = 0,
    /// 运行中
    Running = 1,
    /// 被取消（对用户显示为空闲 + "已停止"）
    Cancelled = 2,
}

impl SweepState {
    /// 从 u8 转换
    ///
    /// 如果值无效，返回 Idle。
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Cancelled,
            _ => Self::Idle,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

/// 扫描状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicSweepState {
    inner: AtomicU8,
}

impl AtomicSweepState {
    pub fn new(state: SweepState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self, ordering: Ordering) -> SweepState {
        SweepState::from_u8(self.inner.load(ordering))
    }

    pub fn set(&self, state: SweepState, ordering: Ordering) {
        self.inner.store(state.as_u8(), ordering);
    }

    /// 比较并交换，成功返回 true
    pub fn compare_exchange(
        &self,
        current: SweepState,
        new: SweepState,
        success: Ordering,
        failure: Ordering,
    ) -> bool {
        self.inner
            .compare_exchange(current.as_u8(), new.as_u8(), success, failure)
            .is_ok()
    }
}

/// 扫描进度事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepEvent {
    /// 扫描开始，附带完整目标序列
    Started { targets: Vec<i32> },
    /// 第 `index` 步（从 1 开始）；`sent` 为 false 表示写入失败
    Step {
        index: usize,
        total: usize,
        rpm: i32,
        sent: bool,
    },
    /// 全部目标已下发并等待完毕
    Completed,
    /// 扫描被取消（或链路断开）
    Cancelled,
}

/// 扫描结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed { steps: usize },
    Cancelled { steps: usize },
}

/// 扫描序列器
///
/// 同一时刻最多运行一个扫描。
pub struct SweepSequencer {
    state: Arc<AtomicSweepState>,
    config: SweepConfig,
    notices: EventSender,
}

impl SweepSequencer {
    /// 创建序列器
    ///
    /// 进度同时以通知形式写入 `notices`（链路事件队列）。
    pub fn new(config: SweepConfig, notices: EventSender) -> Self {
        Self {
            state: Arc::new(AtomicSweepState::default()),
            config,
            notices,
        }
    }

    pub fn state(&self) -> SweepState {
        self.state.get(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// 启动扫描
    ///
    /// 校验失败时不改变状态、不下发任何命令。`token` 通常是链路连接的
    /// 子令牌，断开连接即取消扫描。
    ///
    /// # 错误
    /// - 计划校验错误（见 [`SweepPlan::validate`]）
    /// - `NotConnected`: 链路未连接
    /// - `AlreadyRunning`: 已有扫描在运行
    /// - `Spawn`: 扫描线程启动失败
    pub fn start(
        &self,
        plan: SweepPlan,
        sender: CommandSender,
        token: CancellationToken,
    ) -> Result<SweepHandle, SweepError> {
        plan.validate()?;
        if !sender.is_connected() {
            return Err(SweepError::NotConnected);
        }

        let entered = [SweepState::Idle, SweepState::Cancelled].into_iter().any(|from| {
            self.state
                .compare_exchange(from, SweepState::Running, Ordering::AcqRel, Ordering::Acquire)
        });
        if !entered {
            return Err(SweepError::AlreadyRunning);
        }

        let token = token.child();
        let targets = plan.targets();
        let (progress_tx, progress_rx) = unbounded();
        let run = SweepRun {
            plan,
            targets: targets.clone(),
            sender,
            notices: self.notices.clone(),
            token: token.clone(),
            state: self.state.clone(),
            progress: progress_tx,
            slice: self.config.wait_slice(),
        };

        let thread = std::thread::Builder::new()
            .name("pidtune-sweep".into())
            .spawn(move || run.execute())
            .map_err(|e| {
                self.state.set(SweepState::Idle, Ordering::Release);
                SweepError::Spawn(e.to_string())
            })?;

        Ok(SweepHandle {
            token,
            progress: progress_rx,
            thread: Some(thread),
            targets,
        })
    }
}

/// 扫描线程上下文
struct SweepRun {
    plan: SweepPlan,
    targets: Vec<i32>,
    sender: CommandSender,
    notices: EventSender,
    token: CancellationToken,
    state: Arc<AtomicSweepState>,
    progress: Sender<SweepEvent>,
    slice: Duration,
}

impl SweepRun {
    fn execute(self) -> SweepOutcome {
        let total = self.targets.len();
        info!(
            "Sweep started: {} -> {} step {} every {}s ({} steps)",
            self.plan.start, self.plan.end, self.plan.step, self.plan.interval_secs, total
        );
        self.publish(
            SweepEvent::Started {
                targets: self.targets.clone(),
            },
            format!(
                "sweep started: {} -> {} rpm, step {}, interval {}s",
                self.plan.start, self.plan.end, self.plan.step, self.plan.interval_secs
            ),
        );

        if self.token.is_cancelled() {
            return self.cancelled(0);
        }
        if let Err(e) = self.sender.send_gains() {
            warn!("Sweep: failed to send PID gains: {}", e);
        }

        let interval = self.plan.interval();
        for (i, &rpm) in self.targets.iter().enumerate() {
            if self.token.is_cancelled() {
                return self.cancelled(i);
            }
            let sent = match self.sender.set_target(rpm) {
                Ok(SendOutcome::Sent) => true,
                // 链路已断开，断开连接视为取消
                Ok(SendOutcome::NotConnected) => return self.cancelled(i),
                Err(e) => {
                    warn!("Sweep: failed to send target {}: {}", rpm, e);
                    false
                },
            };

            let index = i + 1;
            let notice = if sent {
                format!("sweep step {index}/{total}: target {rpm} rpm")
            } else {
                format!("sweep step {index}/{total}: target {rpm} rpm (send failed)")
            };
            self.publish(
                SweepEvent::Step {
                    index,
                    total,
                    rpm,
                    sent,
                },
                notice,
            );

            if self.token.sleep(interval, self.slice) {
                return self.cancelled(index);
            }
        }

        self.state.set(SweepState::Idle, Ordering::Release);
        info!("Sweep completed ({} steps)", total);
        self.publish(SweepEvent::Completed, "sweep completed".to_string());
        SweepOutcome::Completed { steps: total }
    }

    fn cancelled(&self, steps: usize) -> SweepOutcome {
        self.state.set(SweepState::Cancelled, Ordering::Release);
        info!("Sweep stopped after {} steps", steps);
        self.publish(SweepEvent::Cancelled, "sweep stopped".to_string());
        SweepOutcome::Cancelled { steps }
    }

    fn publish(&self, event: SweepEvent, notice: String) {
        // 句柄可能已被丢弃，进度通道断开不影响扫描本身
        let _ = self.progress.send(event);
        self.notices.notice(notice);
    }
}

/// 运行中的扫描句柄
///
/// 句柄被丢弃时扫描随之取消。
pub struct SweepHandle {
    token: CancellationToken,
    progress: Receiver<SweepEvent>,
    thread: Option<JoinHandle<SweepOutcome>>,
    targets: Vec<i32>,
}

impl SweepHandle {
    /// 请求取消（最迟一个等待分片内生效）
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// 目标转速序列
    pub fn targets(&self) -> &[i32] {
        &self.targets
    }

    /// 进度事件接收端
    pub fn events(&self) -> &Receiver<SweepEvent> {
        &self.progress
    }

    /// 取出当前已到达的进度事件
    pub fn drain_events(&self) -> Vec<SweepEvent> {
        self.progress.try_iter().collect()
    }

    /// 等待扫描线程结束
    pub fn join(mut self) -> Result<SweepOutcome, SweepError> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| SweepError::Panicked),
            None => Err(SweepError::Panicked),
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_state_conversions() {
        assert_eq!(SweepState::from_u8(0), SweepState::Idle);
        assert_eq!(SweepState::from_u8(1), SweepState::Running);
        assert_eq!(SweepState::from_u8(2), SweepState::Cancelled);
        assert_eq!(SweepState::from_u8(9), SweepState::Idle);
        assert!(SweepState::Running.is_running());
    }

    #[test]
    fn test_atomic_sweep_state() {
        let state = AtomicSweepState::default();
        assert!(state.compare_exchange(
            SweepState::Idle,
            SweepState::Running,
            Ordering::AcqRel,
            Ordering::Acquire
        ));
        assert!(!state.compare_exchange(
            SweepState::Idle,
            SweepState::Running,
            Ordering::AcqRel,
            Ordering::Acquire
        ));
        state.set(SweepState::Cancelled, Ordering::Release);
        assert_eq!(state.get(Ordering::Acquire), SweepState::Cancelled);
    }

    #[test]
    fn test_default_wait_slice() {
        assert_eq!(SweepConfig::default().wait_slice(), Duration::from_millis(100));
    }
}
