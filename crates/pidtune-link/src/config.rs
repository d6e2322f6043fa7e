//! 链路配置

use crate::reader::ReaderConfig;
use pidtune_protocol::WireFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 链路配置
///
/// 缺省字段使用默认值，可以直接从 TOML 的 `[link]` 段反序列化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// 读取线程配置
    #[serde(flatten)]
    pub reader: ReaderConfig,
    /// 出站命令线格式
    pub wire_format: WireFormat,
    /// 断开连接时等待读取线程退出的超时（毫秒）
    pub join_timeout_ms: u64,
    /// 遥测历史容量（样本数）
    pub history_capacity: usize,
    /// 时间轴显示窗口（秒）
    pub time_window_secs: f64,
    /// 一键发送时 PID 与目标转速之间的间隔（毫秒）
    pub send_gap_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            reader: ReaderConfig::default(),
            wire_format: WireFormat::default(),
            join_timeout_ms: 1000,
            history_capacity: 500,
            time_window_secs: 30.0,
            send_gap_ms: 100,
        }
    }
}

impl LinkConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn send_gap(&self) -> Duration {
        Duration::from_millis(self.send_gap_ms)
    }
}
