//! 链路层模块
//!
//! 本模块在不可靠的字节流与有序的类型化事件流之间架桥，包括：
//! - 后台读取线程（跨读取边界重组换行分隔的帧）
//! - 事件队列（读取线程 → 调度器，严格 FIFO）
//! - 调度器（周期性 tick 中排空队列、解析记录、维护遥测历史）
//! - 命令发送（尽力而为写入，未连接时为无错误的空操作）
//! - 会话生命周期（先停止并 join 读取线程，再关闭传输句柄）
//!
//! # 数据流
//!
//! ```text
//! Transport ─▶ reader_loop ─▶ EventQueue ─▶ Dispatcher ─▶ {TelemetryHistory, status, log}
//! CommandSender ─▶ Transport（与读取路径正交）
//! ```

mod assembler;
mod cancel;
mod commander;
mod config;
mod dispatcher;
mod error;
mod framer;
mod history;
mod metrics;
mod queue;
mod reader;
mod session;
mod state;

pub use assembler::LegacyTelemetryAssembler;
pub use cancel::CancellationToken;
pub use commander::{CommandSender, SendOutcome};
pub use config::LinkConfig;
pub use dispatcher::{DispatchReport, Dispatcher, LogEntry, TelemetrySnapshot};
pub use error::LinkError;
pub use framer::{FramerOutput, LineFramer};
pub use history::{DisplayRange, DisplayRanges, Sample, TelemetryHistory};
pub use metrics::{LinkMetrics, MetricsSnapshot};
pub use queue::{EventReceiver, EventSender, LinkEvent, event_queue};
pub use reader::{ReaderConfig, reader_loop};
pub use session::LinkSession;
pub use state::{AtomicConnectionState, ConnectionState};
