//! # PID Tune Protocol
//!
//! 电机控制器串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `record`: 设备上报记录（遥测、响应、日志、状态、错误）
//! - `adapter`: 帧分类适配器链（结构化 JSON / 旧版标签行 / 命令回显）
//! - `command`: 下行命令编码
//! - `gains`: PID 参数集
//!
//! ## 帧格式
//!
//! 协议以换行符分隔，每行一条消息。两种历史格式并存：
//!
//! ```text
//! {"type":"data","target_rpm":100,"current_rpm":98.5,"error":1.5,"motor_output":40}
//! >current_rpm:98.5
//! ERROR:encoder timeout
//! ```

pub mod adapter;
pub mod command;
pub mod gains;
pub mod record;

pub use adapter::{
    AdapterChain, CommandEchoAdapter, LegacyTagAdapter, ProtocolAdapter, StructuredAdapter,
    parse_frame,
};
pub use command::{Command, WireFormat};
pub use gains::PidGains;
pub use record::{Record, ResponseStatus, Telemetry, TelemetryField};

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// PID 参数超出设计范围
    #[error("Gain {name} = {value} out of range [{min}, {max}]")]
    GainOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// 参数文本无法解析
    #[error("Invalid gain text: {0}")]
    InvalidGainText(String),

    /// 命令中包含 NaN / 无穷大
    #[error("Non-finite value in command field {field}")]
    NonFiniteValue { field: &'static str },

    /// JSON 编码失败
    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}
