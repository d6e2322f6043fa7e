//! # PID Tune Control
//!
//! 自动扫描测试：按计划依次下发目标转速，每步之间等待固定时间，
//! 可随时取消（断开连接也视为取消）。
//!
//! ## 状态机
//!
//! ```text
//! Idle ─start(plan 校验通过)─▶ Running ─┬─ 走完全部目标 ─▶ Idle
//!                                      └─ 取消 / 断开 ──▶ Cancelled
//! ```

mod error;
mod plan;
mod sequencer;

pub use error::SweepError;
pub use plan::SweepPlan;
pub use sequencer::{
    AtomicSweepState, SweepConfig, SweepEvent, SweepHandle, SweepOutcome, SweepSequencer,
    SweepState,
};
