//! 链路指标
//!
//! 原子计数器，读取线程、命令发送路径与监控方可以无锁地并发访问。

use std::sync::atomic::{AtomicU64, Ordering};

/// 链路实时指标
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// 从传输读到的总字节数
    pub bytes_read: AtomicU64,

    /// 入队的完整帧数
    pub frames_queued: AtomicU64,

    /// UTF-8 解码失败的行数（整行丢弃，不影响后续帧）
    pub decode_faults: AtomicU64,

    /// 读取时的 I/O 错误次数（每次之后退避重试）
    pub io_faults: AtomicU64,

    /// 超长未完成帧被丢弃的次数
    pub oversized_dropped: AtomicU64,

    /// 成功写入的命令数
    pub commands_sent: AtomicU64,

    /// 未连接时被跳过的命令数
    pub commands_skipped: AtomicU64,

    /// 写入失败的命令数
    pub write_faults: AtomicU64,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 各计数器分别以 Relaxed 读取，计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            frames_queued: self.frames_queued.load(Ordering::Relaxed),
            decode_faults: self.decode_faults.load(Ordering::Relaxed),
            io_faults: self.io_faults.load(Ordering::Relaxed),
            oversized_dropped: self.oversized_dropped.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            commands_skipped: self.commands_skipped.load(Ordering::Relaxed),
            write_faults: self.write_faults.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub bytes_read: u64,
    pub frames_queued: u64,
    pub decode_faults: u64,
    pub io_faults: u64,
    pub oversized_dropped: u64,
    pub commands_sent: u64,
    pub commands_skipped: u64,
    pub write_faults: u64,
}

impl MetricsSnapshot {
    /// 读取路径上的故障总数
    pub fn read_faults(&self) -> u64 {
        self.decode_faults + self.io_faults + self.oversized_dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = LinkMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.read_faults(), 0);
    }

    #[test]
    fn test_metrics_concurrent_updates() {
        let metrics = Arc::new(LinkMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.frames_queued.fetch_add(1, Ordering::Relaxed);
                        metrics.io_faults.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_queued, 4000);
        assert_eq!(snapshot.read_faults(), 4000);
    }
}
