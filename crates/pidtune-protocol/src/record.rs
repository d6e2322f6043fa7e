//! 设备上报记录类型

use crate::command::Command;

/// 遥测数据
///
/// 所有字段缺失时默认为 0。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Telemetry {
    /// 目标转速（RPM）
    pub target_rpm: f64,
    /// 当前转速（RPM）
    pub current_rpm: f64,
    /// 误差（target - current，由设备计算）
    pub error: f64,
    /// 电机输出（PWM 占空比等，单位由设备决定）
    pub motor_output: f64,
}

impl Telemetry {
    /// 按字段写入
    pub fn set(&mut self, field: TelemetryField, value: f64) {
        match field {
            TelemetryField::TargetRpm => self.target_rpm = value,
            TelemetryField::CurrentRpm => self.current_rpm = value,
            TelemetryField::Error => self.error = value,
            TelemetryField::MotorOutput => self.motor_output = value,
        }
    }

    /// 按字段读取
    pub fn get(&self, field: TelemetryField) -> f64 {
        match field {
            TelemetryField::TargetRpm => self.target_rpm,
            TelemetryField::CurrentRpm => self.current_rpm,
            TelemetryField::Error => self.error,
            TelemetryField::MotorOutput => self.motor_output,
        }
    }
}

/// 遥测字段名
///
/// 结构化格式与旧版标签行使用相同的字段名（区分大小写）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryField {
    TargetRpm,
    CurrentRpm,
    Error,
    MotorOutput,
}

impl TelemetryField {
    pub const ALL: [TelemetryField; 4] = [
        TelemetryField::TargetRpm,
        TelemetryField::CurrentRpm,
        TelemetryField::Error,
        TelemetryField::MotorOutput,
    ];

    /// 线上字段名
    pub fn wire_name(self) -> &'static str {
        match self {
            TelemetryField::TargetRpm => "target_rpm",
            TelemetryField::CurrentRpm => "current_rpm",
            TelemetryField::Error => "error",
            TelemetryField::MotorOutput => "motor_output",
        }
    }

    /// 从线上字段名解析（精确匹配）
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.wire_name() == name)
    }

    /// 帧组掩码位（用于旧版逐行遥测聚合）
    pub fn mask_bit(self) -> u8 {
        match self {
            TelemetryField::TargetRpm => 0b0001,
            TelemetryField::CurrentRpm => 0b0010,
            TelemetryField::Error => 0b0100,
            TelemetryField::MotorOutput => 0b1000,
        }
    }
}

/// 命令响应状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Failure,
}

impl ResponseStatus {
    /// `"success"` 以外的任何取值都视为失败
    pub fn from_wire(status: &str) -> Self {
        if status == "success" {
            ResponseStatus::Success
        } else {
            ResponseStatus::Failure
        }
    }

    pub fn is_success(self) -> bool {
        self == ResponseStatus::Success
    }
}

/// 解析后的设备记录
///
/// 每个原始帧对应且仅对应一个 `Record`。解析失败不会产生错误，
/// 而是降级为 `Unrecognized` 或 `Error`。
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// 完整遥测样本（结构化格式）
    Telemetry(Telemetry),
    /// 单个遥测字段（旧版 `>field:value` 逐行格式，由调度器聚合）
    TelemetryField { field: TelemetryField, value: f64 },
    /// 命令响应
    Response {
        status: ResponseStatus,
        message: String,
    },
    /// 设备日志
    Log { message: String },
    /// 设备状态
    Status { message: String },
    /// 设备或链路错误
    Error { message: String },
    /// 命令回显（设备回显或本地回环）
    Echo(Command),
    /// 无法分类的帧
    Unrecognized { raw: String },
}

impl Record {
    pub fn unrecognized(raw: impl Into<String>) -> Self {
        Record::Unrecognized { raw: raw.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Record::Error {
            message: message.into(),
        }
    }

    /// 记录类别名（用于日志前缀）
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Telemetry(_) | Record::TelemetryField { .. } => "data",
            Record::Response { .. } => "response",
            Record::Log { .. } => "log",
            Record::Status { .. } => "status",
            Record::Error { .. } => "error",
            Record::Echo(_) => "echo",
            Record::Unrecognized { .. } => "unrecognized",
        }
    }
}
