//! 扫描计划

use crate::error::SweepError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 扫描计划
///
/// 目标序列为从 `start` 开始、以 `step` 为步长、不越过 `end` 的等差数列
/// （`end` 恰好落在数列上时包含 `end`）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    /// 起始转速（RPM）
    pub start: i32,
    /// 结束转速（RPM，包含）
    pub end: i32,
    /// 步长（RPM，可为负）
    pub step: i32,
    /// 每步停留时间（秒）
    pub interval_secs: f64,
}

impl SweepPlan {
    /// 单次扫描的步数上限
    pub const MAX_STEPS: u64 = 10_000;

    /// 每步停留时间上限（秒）
    pub const MAX_INTERVAL_SECS: f64 = 86_400.0;

    pub fn new(start: i32, end: i32, step: i32, interval_secs: f64) -> Self {
        Self {
            start,
            end,
            step,
            interval_secs,
        }
    }

    /// 校验计划
    ///
    /// # 错误
    /// - `ZeroStep`: 步长为 0
    /// - `NegativeBound`: 起止转速为负
    /// - `InvalidInterval`: 间隔不在 (0, `MAX_INTERVAL_SECS`] 内
    /// - `DirectionMismatch`: 正步长要求 start ≤ end，负步长要求 start ≥ end
    /// - `TooManySteps`: 步数超过 `MAX_STEPS`
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.step == 0 {
            return Err(SweepError::ZeroStep);
        }
        for (name, value) in [("start", self.start), ("end", self.end)] {
            if value < 0 {
                return Err(SweepError::NegativeBound { name, value });
            }
        }
        if !(self.interval_secs > 0.0 && self.interval_secs <= Self::MAX_INTERVAL_SECS) {
            return Err(SweepError::InvalidInterval(self.interval_secs));
        }
        if (self.step > 0 && self.start > self.end) || (self.step < 0 && self.start < self.end) {
            return Err(SweepError::DirectionMismatch {
                start: self.start,
                end: self.end,
                step: self.step,
            });
        }

        let count = self.step_count();
        if count > Self::MAX_STEPS {
            return Err(SweepError::TooManySteps {
                count,
                max: Self::MAX_STEPS,
            });
        }
        Ok(())
    }

    /// 步数（仅对方向正确的计划有意义）
    pub fn step_count(&self) -> u64 {
        if self.step == 0 {
            return 0;
        }
        let distance = (i64::from(self.end) - i64::from(self.start)).unsigned_abs();
        distance / i64::from(self.step).unsigned_abs() + 1
    }

    /// 目标转速序列
    pub fn targets(&self) -> Vec<i32> {
        if self.validate().is_err() {
            return Vec::new();
        }
        let step = i64::from(self.step);
        let end = i64::from(self.end);
        let mut value = i64::from(self.start);
        let mut targets = Vec::with_capacity(self.step_count() as usize);
        while (step > 0 && value <= end) || (step < 0 && value >= end) {
            // 0 ≤ value ≤ i32::MAX，转换不会截断
            targets.push(value as i32);
            value += step;
        }
        targets
    }

    /// 每步停留时间（非法间隔返回 0）
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_secs).unwrap_or_default()
    }
}
