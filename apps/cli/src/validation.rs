//! 输入验证模块
//!
//! 命令行参数在连接设备之前完成校验，校验失败不会打开串口。

use anyhow::{Context, Result};
use pidtune_control::SweepPlan;
use pidtune_protocol::PidGains;

/// 解析 `kp,ki,kd` 格式的 PID 参数
pub fn parse_pid(text: &str) -> Result<PidGains> {
    text.parse::<PidGains>()
        .with_context(|| format!("无效的 PID 参数: {text:?}（格式 kp,ki,kd，每项范围 [0, 2]）"))
}

/// 校验目标转速
pub fn validate_rpm(rpm: i32) -> Result<i32> {
    if rpm < 0 {
        anyhow::bail!("目标转速必须 >= 0，当前为 {}", rpm);
    }
    Ok(rpm)
}

/// 构造并校验扫描计划
pub fn sweep_plan(start: i32, end: i32, step: i32, interval_secs: f64) -> Result<SweepPlan> {
    let plan = SweepPlan::new(start, end, step, interval_secs);
    plan.validate().context("扫描计划无效")?;
    Ok(plan)
}
