//! 遥测历史与显示范围
//!
//! 历史是有界的环形缓冲区，只保留最近 `capacity` 个样本，时间戳单调不减。

use pidtune_protocol::Telemetry;
use std::collections::VecDeque;

/// 带时间戳的遥测样本
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// 相对于调度器启动的秒数
    pub timestamp: f64,
    pub telemetry: Telemetry,
}

/// 有界遥测历史
#[derive(Debug, Clone)]
pub struct TelemetryHistory {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl TelemetryHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 追加样本，超出容量时淘汰最旧的样本
    ///
    /// 早于上一个样本的时间戳会被抬升到上一个样本的时间戳。
    pub fn push(&mut self, timestamp: f64, telemetry: Telemetry) -> Sample {
        let timestamp = match self.samples.back() {
            Some(last) if timestamp < last.timestamp => last.timestamp,
            _ => timestamp,
        };
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        let sample = Sample {
            timestamp,
            telemetry,
        };
        self.samples.push_back(sample);
        sample
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.iter()
    }

    /// 按时间顺序复制所有样本
    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// 计算三条坐标轴的显示范围（历史为空时返回 `None`）
    pub fn display_ranges(&self, time_window_secs: f64) -> Option<DisplayRanges> {
        let latest = self.latest()?;
        let rpm = DisplayRange::from_values(
            self.iter().flat_map(|s| {
                [s.telemetry.target_rpm, s.telemetry.current_rpm]
            }),
            true,
        )?;
        let signal = DisplayRange::from_values(
            self.iter()
                .flat_map(|s| [s.telemetry.error, s.telemetry.motor_output]),
            false,
        )?;
        let time = DisplayRange {
            min: (latest.timestamp - time_window_secs).max(0.0),
            max: latest.timestamp + DisplayRange::TIME_LEAD_SECS,
        };
        Some(DisplayRanges { time, rpm, signal })
    }
}

/// 单轴显示范围
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRange {
    pub min: f64,
    pub max: f64,
}

impl DisplayRange {
    /// 上下留白占数据跨度的比例
    pub const MARGIN: f64 = 0.1;
    /// 全零数据时的默认半跨度
    pub const DEFAULT_HALF_SPAN: f64 = 10.0;
    /// 时间轴在最新样本之后的留白（秒）
    pub const TIME_LEAD_SECS: f64 = 0.5;

    /// 由数据计算范围
    ///
    /// `include_zero` 为 true 时下界至少包含 0（转速轴）。宽度为 0 的范围
    /// 展开为 `中心 ± 10%`，中心为 0 时展开为 `±DEFAULT_HALF_SPAN`。
    /// 没有有限值时返回 `None`。
    pub fn from_values(values: impl IntoIterator<Item = f64>, include_zero: bool) -> Option<Self> {
        let (mut lo, hi) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;
        if include_zero {
            lo = lo.min(0.0);
        }

        let span = hi - lo;
        if span <= 0.0 {
            let center = lo;
            let half = if center == 0.0 {
                Self::DEFAULT_HALF_SPAN
            } else {
                center.abs() * Self::MARGIN
            };
            return Some(Self {
                min: center - half,
                max: center + half,
            });
        }

        let margin = span * Self::MARGIN;
        Some(Self {
            min: lo - margin,
            max: hi + margin,
        })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// 三条坐标轴的显示范围
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRanges {
    /// 时间轴（秒）
    pub time: DisplayRange,
    /// 转速轴（目标与当前转速）
    pub rpm: DisplayRange,
    /// 信号轴（误差与电机输出）
    pub signal: DisplayRange,
}
