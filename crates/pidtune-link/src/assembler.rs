//! 旧版逐行遥测聚合
//!
//! 旧版固件每个字段单独一行（`>target_rpm:100`、`>current_rpm:98` ...）。
//! 聚合器用帧组掩码记录本组已收到的字段：
//! - 目标转速、当前转速、电机输出都到齐时提交一个完整样本
//! - 某字段在本组内重复出现时，先提交已有的部分样本，再开始新组
//!
//! 缺失的字段保持 0。

use pidtune_protocol::{Telemetry, TelemetryField};

/// 提交一个样本所需的字段（误差字段可选）
const COMPLETE_MASK: u8 = 0b1011;

/// 旧版遥测聚合器
#[derive(Debug, Default)]
pub struct LegacyTelemetryAssembler {
    pending: Telemetry,
    mask: u8,
}

impl LegacyTelemetryAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一个字段，若有样本完成则返回
    pub fn push(&mut self, field: TelemetryField, value: f64) -> Option<Telemetry> {
        let bit = field.mask_bit();
        let repeated = if self.mask & bit != 0 {
            self.take()
        } else {
            None
        };

        self.pending.set(field, value);
        self.mask |= bit;

        if repeated.is_some() {
            return repeated;
        }
        if self.mask & COMPLETE_MASK == COMPLETE_MASK {
            return self.take();
        }
        None
    }

    /// 提交尚未完成的部分样本
    pub fn flush(&mut self) -> Option<Telemetry> {
        self.take()
    }

    pub fn is_pending(&self) -> bool {
        self.mask != 0
    }

    fn take(&mut self) -> Option<Telemetry> {
        if self.mask == 0 {
            return None;
        }
        self.mask = 0;
        Some(std::mem::take(&mut self.pending))
    }
}
