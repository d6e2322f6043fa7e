//! 后台读取线程
//!
//! 读取线程只做三件事：从传输读字节、重组帧、把帧和故障按到达顺序入队。
//! 解析与状态更新全部留给调度器，读取线程从不触碰界面状态。

use crate::cancel::CancellationToken;
use crate::framer::{FramerOutput, LineFramer};
use crate::metrics::LinkMetrics;
use crate::queue::EventSender;
use pidtune_serial::TransportReader;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 读取线程配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// 无数据时的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 读取出错后的退避时间（毫秒）
    pub error_backoff_ms: u64,
    /// 单次读取的缓冲区大小
    pub read_chunk_size: usize,
    /// 未完成帧的长度上限，超出后丢弃并上报故障
    pub max_frame_len: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            error_backoff_ms: 500,
            read_chunk_size: 1024,
            max_frame_len: 4096,
        }
    }
}

/// 读取线程主循环
///
/// 唯一的退出条件是 `stop` 被取消；任何读取或解码错误都只入队一条
/// `LinkEvent::Fault` 然后继续运行。
///
/// # 参数
/// - `reader`: 传输读端（由本线程独占）
/// - `events`: 事件队列生产端
/// - `stop`: 停止令牌（断开连接时取消）
/// - `config`: 读取配置
/// - `metrics`: 链路指标
pub fn reader_loop(
    mut reader: impl TransportReader,
    events: EventSender,
    stop: CancellationToken,
    config: ReaderConfig,
    metrics: Arc<LinkMetrics>,
) {
    info!("Reader thread started");

    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let error_backoff = Duration::from_millis(config.error_backoff_ms);
    let mut framer = LineFramer::new(config.max_frame_len);
    let mut buf = vec![0u8; config.read_chunk_size.max(1)];

    loop {
        if stop.is_cancelled() {
            trace!("Reader thread: stop requested, exiting");
            break;
        }

        match reader.read_available(&mut buf) {
            Ok(0) => {
                spin_sleep::sleep(poll_interval);
            },
            Ok(n) => {
                metrics.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
                framer.push(&buf[..n], |output| match output {
                    FramerOutput::Frame(frame) => {
                        trace!("Frame: {}", frame);
                        metrics.frames_queued.fetch_add(1, Ordering::Relaxed);
                        events.frame(frame);
                    },
                    FramerOutput::DecodeFault(message) => {
                        metrics.decode_faults.fetch_add(1, Ordering::Relaxed);
                        warn!("{}", message);
                        events.fault(message);
                    },
                    FramerOutput::Overflow(dropped) => {
                        metrics.oversized_dropped.fetch_add(1, Ordering::Relaxed);
                        warn!("Dropped {} bytes without newline", dropped);
                        events.fault(format!(
                            "frame exceeded {} bytes without newline, {} bytes dropped",
                            config.max_frame_len, dropped
                        ));
                    },
                });
            },
            Err(e) => {
                metrics.io_faults.fetch_add(1, Ordering::Relaxed);
                warn!("Read error: {}, backing off {:?}", e, error_backoff);
                events.fault(format!("read error: {e}"));
                // 未完成的帧在出错后不再可信
                framer.reset();
                if stop.sleep(error_backoff, poll_interval) {
                    debug!("Reader thread: stop requested during backoff");
                    break;
                }
            },
        }
    }

    info!("Reader thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{LinkEvent, event_queue};
    use pidtune_serial::{MockTransport, Transport};
    use std::thread;
    use std::time::Instant;

    fn fast_config() -> ReaderConfig {
        ReaderConfig {
            poll_interval_ms: 1,
            error_backoff_ms: 20,
            ..ReaderConfig::default()
        }
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_reader_survives_faults() {
        let mock = MockTransport::new();
        mock.push_bytes(b"first\nsec".to_vec());
        mock.push_fault("line noise");
        mock.push_bytes(b"third\n\xff\nfourth\n".to_vec());
        let (reader, _writer) = mock.clone().split().unwrap();

        let (tx, rx) = event_queue();
        let stop = CancellationToken::new();
        let metrics = Arc::new(LinkMetrics::new());
        let handle = {
            let stop = stop.clone();
            let metrics = metrics.clone();
            thread::spawn(move || reader_loop(reader, tx, stop, fast_config(), metrics))
        };

        assert!(wait_for(|| rx.len() >= 6));
        stop.cancel();
        handle.join().unwrap();

        let events: Vec<_> = std::iter::from_fn(|| rx.try_pop()).collect();
        assert_eq!(events[0], LinkEvent::Frame("first".into()));
        assert!(matches!(&events[1], LinkEvent::Fault(m) if m.contains("line noise")));
        // 出错前的残帧 "sec" 被丢弃
        assert_eq!(events[2], LinkEvent::Frame("third".into()));
        assert!(matches!(&events[3], LinkEvent::Fault(m) if m.contains("UTF-8")));
        assert_eq!(events[4], LinkEvent::Frame("\u{FFFD}".into()));
        assert_eq!(events[5], LinkEvent::Frame("fourth".into()));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_queued, 4);
        assert_eq!(snapshot.io_faults, 1);
        assert_eq!(snapshot.decode_faults, 1);
    }

    #[test]
    fn test_reader_keeps_running_until_cancelled() {
        let mock = MockTransport::new();
        let (reader, _writer) = mock.clone().split().unwrap();
        let (tx, _rx) = event_queue();
        let stop = CancellationToken::new();
        let handle = {
            let stop = stop.clone();
            thread::spawn(move || {
                reader_loop(reader, tx, stop, fast_config(), Arc::new(LinkMetrics::new()))
            })
        };

        // 持续的读取错误不会让线程退出
        for _ in 0..3 {
            mock.push_fault("unplugged");
        }
        assert!(wait_for(|| mock.pending_reads() == 0));
        assert!(!handle.is_finished());

        stop.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn test_cancel_interrupts_backoff() {
        let mock = MockTransport::new();
        mock.push_fault("gone");
        let (reader, _writer) = mock.clone().split().unwrap();
        let (tx, rx) = event_queue();
        let stop = CancellationToken::new();
        let config = ReaderConfig {
            error_backoff_ms: 10_000,
            ..fast_config()
        };
        let handle = {
            let stop = stop.clone();
            thread::spawn(move || {
                reader_loop(reader, tx, stop, config, Arc::new(LinkMetrics::new()))
            })
        };

        assert!(wait_for(|| rx.len() == 1));
        let start = Instant::now();
        stop.cancel();
        handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
