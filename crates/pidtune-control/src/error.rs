//! 扫描错误类型定义

use thiserror::Error;

/// 扫描错误类型
///
/// 校验类错误在任何状态变更或命令发送之前同步返回。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SweepError {
    /// 步长为 0
    #[error("Sweep step must not be zero")]
    ZeroStep,

    /// 起止转速为负
    #[error("Sweep {name} must be >= 0, got {value}")]
    NegativeBound { name: &'static str, value: i32 },

    /// 间隔不在允许范围内
    #[error("Sweep interval must be in (0, 86400] seconds, got {0}")]
    InvalidInterval(f64),

    /// 步长方向与起止方向不一致
    #[error("Step {step} cannot reach {end} from {start}")]
    DirectionMismatch { start: i32, end: i32, step: i32 },

    /// 步数过多
    #[error("Sweep has {count} steps, at most {max} allowed")]
    TooManySteps { count: u64, max: u64 },

    /// 已有扫描在运行
    #[error("A sweep is already running")]
    AlreadyRunning,

    /// 链路未连接
    #[error("Not connected")]
    NotConnected,

    /// 扫描线程启动失败
    #[error("Failed to spawn sweep thread: {0}")]
    Spawn(String),

    /// 扫描线程异常退出
    #[error("Sweep thread panicked")]
    Panicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_error_display() {
        let err = SweepError::DirectionMismatch {
            start: 50,
            end: 10,
            step: 10,
        };
        assert_eq!(err.to_string(), "Step 10 cannot reach 10 from 50");

        let err = SweepError::NegativeBound {
            name: "start",
            value: -5,
        };
        assert_eq!(err.to_string(), "Sweep start must be >= 0, got -5");
    }
}
