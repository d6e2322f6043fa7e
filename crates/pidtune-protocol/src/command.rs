//! 下行命令编码
//!
//! 两种意图：设置 PID 增益、设置目标转速。编码结果以换行符结尾，
//! 可以直接写入串口。

use crate::{PidGains, ProtocolError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 出站线格式
///
/// 设备端没有格式协商，需要与固件实际使用的格式保持一致。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// `{"command":"set_pid",...}`
    #[default]
    Structured,
    /// `PID:kp,ki,kd` / `RPM:n`
    Legacy,
}

/// 下行命令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// 设置 PID 增益
    SetPid { kp: f64, ki: f64, kd: f64 },
    /// 设置目标转速
    SetTarget { rpm: i32 },
}

/// 结构化格式的 serde 映射（`command` 字段作为判别符）
#[derive(Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum StructuredCommand {
    SetPid { kp: f64, ki: f64, kd: f64 },
    SetRpm { value: i32 },
}

impl Command {
    /// 从已校验的增益构造
    pub fn set_pid(gains: PidGains) -> Self {
        Command::SetPid {
            kp: gains.kp(),
            ki: gains.ki(),
            kd: gains.kd(),
        }
    }

    pub fn set_target(rpm: i32) -> Self {
        Command::SetTarget { rpm }
    }

    /// 编码为一行线数据（含结尾 `\n`）
    ///
    /// # 错误
    /// - `NonFiniteValue`: 增益为 NaN 或无穷大（JSON 无法表示）
    pub fn encode(&self, format: WireFormat) -> Result<Vec<u8>, ProtocolError> {
        if let Command::SetPid { kp, ki, kd } = *self {
            for (field, value) in [("kp", kp), ("ki", ki), ("kd", kd)] {
                if !value.is_finite() {
                    return Err(ProtocolError::NonFiniteValue { field });
                }
            }
        }

        let mut line = match format {
            WireFormat::Structured => {
                let wire = match *self {
                    Command::SetPid { kp, ki, kd } => StructuredCommand::SetPid { kp, ki, kd },
                    Command::SetTarget { rpm } => StructuredCommand::SetRpm { value: rpm },
                };
                serde_json::to_string(&wire)?
            },
            WireFormat::Legacy => match *self {
                Command::SetPid { kp, ki, kd } => format!("PID:{kp},{ki},{kd}"),
                Command::SetTarget { rpm } => format!("RPM:{rpm}"),
            },
        };
        line.push('\n');
        Ok(line.into_bytes())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetPid { kp, ki, kd } => {
                write!(f, "set_pid Kp={kp:.2}, Ki={ki:.2}, Kd={kd:.2}")
            },
            Command::SetTarget { rpm } => write!(f, "set_rpm {rpm}"),
        }
    }
}
