//! 链路会话生命周期
//!
//! 会话拥有连接状态、写端槽位和读取线程句柄。断开连接的顺序固定为：
//! 取消令牌 → 限时 join 读取线程 → 取走并关闭写端 → 状态回到 Disconnected。
//! 读取线程因此永远不会在已关闭的句柄上读取。

use crate::cancel::CancellationToken;
use crate::commander::{CommandSender, WriterSlot};
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::metrics::{LinkMetrics, MetricsSnapshot};
use crate::queue::EventSender;
use crate::reader::reader_loop;
use crate::state::{AtomicConnectionState, ConnectionState};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use pidtune_protocol::PidGains;
use pidtune_serial::{Transport, TransportError, TransportWriter};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{error, info, warn};

/// 带超时的线程 join
///
/// 由看门狗线程执行真正的 `join()`，调用方在通道上限时等待。超时后
/// 看门狗线程继续存在，由操作系统在进程退出时回收。
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 单次连接期间存在的资源
struct ActiveConnection {
    token: CancellationToken,
    reader_thread: Option<JoinHandle<()>>,
    label: String,
}

/// 链路会话
///
/// # 示例
///
/// ```rust,no_run
/// use pidtune_link::{LinkConfig, LinkSession, Dispatcher, event_queue};
/// use pidtune_serial::MockTransport;
///
/// let config = LinkConfig::default();
/// let (tx, rx) = event_queue();
/// let mut session = LinkSession::new(config.clone(), tx);
/// let mut dispatcher = Dispatcher::new(rx, &config);
///
/// session.connect("mock", || Ok(MockTransport::new()))?;
/// session.commander().set_target(1200)?;
/// dispatcher.tick();
/// session.disconnect();
/// # Ok::<(), pidtune_link::LinkError>(())
/// ```
pub struct LinkSession {
    config: LinkConfig,
    state: Arc<AtomicConnectionState>,
    events: EventSender,
    writer: WriterSlot,
    commander: CommandSender,
    metrics: Arc<LinkMetrics>,
    connection: Option<ActiveConnection>,
}

impl LinkSession {
    pub fn new(config: LinkConfig, events: EventSender) -> Self {
        Self::with_gains(config, events, PidGains::default())
    }

    /// 使用给定的初始 PID 参数集创建会话
    pub fn with_gains(config: LinkConfig, events: EventSender, gains: PidGains) -> Self {
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected));
        let writer: WriterSlot = Arc::new(Mutex::new(None));
        let metrics = Arc::new(LinkMetrics::new());
        let commander = CommandSender::new(
            writer.clone(),
            state.clone(),
            events.clone(),
            Arc::new(ArcSwap::from_pointee(gains)),
            config.wire_format,
            metrics.clone(),
        );

        Self {
            config,
            state,
            events,
            writer,
            commander,
            metrics,
            connection: None,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get(Ordering::Acquire)
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// 命令发送器（克隆共享同一写端与 PID 参数集）
    pub fn commander(&self) -> CommandSender {
        self.commander.clone()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 当前连接的子令牌
    ///
    /// 断开连接时取消，可交给扫描等后台任务使用。未连接时返回 `None`。
    pub fn connection_token(&self) -> Option<CancellationToken> {
        self.connection.as_ref().map(|conn| conn.token.child())
    }

    /// 打开传输并启动读取线程
    ///
    /// `open` 失败时不启动任何线程，状态回到 `Disconnected`，并入队一条通知。
    ///
    /// # 错误
    /// - `LinkError::AlreadyConnected`: 会话不处于 `Disconnected`
    /// - `LinkError::Open`: 打开或拆分传输失败
    /// - `LinkError::Spawn`: 读取线程启动失败
    pub fn connect<T, F>(&mut self, label: &str, open: F) -> Result<(), LinkError>
    where
        T: Transport,
        F: FnOnce() -> Result<T, TransportError>,
    {
        if !self.state.compare_exchange(
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            return Err(LinkError::AlreadyConnected(self.state()));
        }

        let (reader, writer) = match open().and_then(T::split) {
            Ok(halves) => halves,
            Err(e) => {
                warn!("Failed to connect to {}: {}", label, e);
                self.events.notice(format!("connection error: {e}"));
                self.state
                    .set(ConnectionState::Disconnected, Ordering::Release);
                return Err(LinkError::Open(e));
            },
        };

        let writer: Box<dyn TransportWriter> = Box::new(writer);
        *self.writer.lock() = Some(writer);
        self.state.set(ConnectionState::Connected, Ordering::Release);

        let token = CancellationToken::new();
        let spawned = {
            let events = self.events.clone();
            let token = token.clone();
            let config = self.config.reader.clone();
            let metrics = self.metrics.clone();
            std::thread::Builder::new()
                .name("pidtune-reader".into())
                .spawn(move || reader_loop(reader, events, token, config, metrics))
        };

        let reader_thread = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to spawn reader thread: {}", e);
                self.release_writer();
                self.state
                    .set(ConnectionState::Disconnected, Ordering::Release);
                return Err(LinkError::Spawn(e));
            },
        };

        info!("Connected to {}", label);
        self.events.notice(format!("connected to {label}"));
        self.connection = Some(ActiveConnection {
            token,
            reader_thread: Some(reader_thread),
            label: label.to_string(),
        });
        Ok(())
    }

    /// 断开连接
    ///
    /// 未连接时为空操作。
    pub fn disconnect(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };

        self.state
            .set(ConnectionState::Disconnecting, Ordering::Release);
        connection.token.cancel();

        let join_timeout = self.config.join_timeout();
        if let Some(handle) = connection.reader_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "Reader thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }

        self.release_writer();
        self.state
            .set(ConnectionState::Disconnected, Ordering::Release);
        info!("Disconnected from {}", connection.label);
        self.events
            .closed(format!("disconnected from {}", connection.label));
    }

    /// 取走并关闭写端
    fn release_writer(&self) {
        let writer = self.writer.lock().take();
        if let Some(mut writer) = writer
            && let Err(e) = writer.close()
        {
            warn!("Error while closing transport: {}", e);
        }
    }
}

impl Drop for LinkSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
