//! PID 参数集
//!
//! 每个增益都是有界实数（设计范围 0–2），只能通过显式构造修改。

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// PID 增益
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    kp: f64,
    ki: f64,
    kd: f64,
}

impl PidGains {
    /// 增益下限
    pub const MIN: f64 = 0.0;
    /// 增益上限
    pub const MAX: f64 = 2.0;

    /// 创建并校验 PID 增益
    ///
    /// # 错误
    /// 任一增益为 NaN/无穷大或超出 `[MIN, MAX]` 时返回 `GainOutOfRange`。
    pub fn new(kp: f64, ki: f64, kd: f64) -> Result<Self, ProtocolError> {
        Self::check("kp", kp)?;
        Self::check("ki", ki)?;
        Self::check("kd", kd)?;
        Ok(Self { kp, ki, kd })
    }

    fn check(name: &'static str, value: f64) -> Result<(), ProtocolError> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ProtocolError::GainOutOfRange {
                name,
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(())
    }

    pub fn kp(&self) -> f64 {
        self.kp
    }

    pub fn ki(&self) -> f64 {
        self.ki
    }

    pub fn kd(&self) -> f64 {
        self.kd
    }
}

impl Default for PidGains {
    /// 调参工具的出厂默认值
    fn default() -> Self {
        Self {
            kp: 0.5,
            ki: 0.2,
            kd: 0.1,
        }
    }
}

impl fmt::Display for PidGains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kp={:.2}, Ki={:.2}, Kd={:.2}", self.kp, self.ki, self.kd)
    }
}

/// 解析 `kp,ki,kd` 文本
impl FromStr for PidGains {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<f64> = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| ProtocolError::InvalidGainText(format!("{s:?}: {e}")))?;

        match values.as_slice() {
            [kp, ki, kd] => Self::new(*kp, *ki, *kd),
            _ => Err(ProtocolError::InvalidGainText(format!(
                "expected 3 comma-separated values, got {}",
                values.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_gains() {
        let gains = PidGains::new(0.5, 0.0, 2.0).unwrap();
        assert_eq!(gains.kp(), 0.5);
        assert_eq!(gains.ki(), 0.0);
        assert_eq!(gains.kd(), 2.0);
    }

    #[test]
    fn test_out_of_range_gains() {
        assert!(matches!(
            PidGains::new(2.5, 0.1, 0.1),
            Err(ProtocolError::GainOutOfRange { name: "kp", .. })
        ));
        assert!(matches!(
            PidGains::new(0.1, -0.1, 0.1),
            Err(ProtocolError::GainOutOfRange { name: "ki", .. })
        ));
        assert!(PidGains::new(0.1, 0.1, f64::NAN).is_err());
    }

    #[test]
    fn test_parse_gains() {
        let gains: PidGains = "0.5, 0.2,0.1".parse().unwrap();
        assert_eq!(gains, PidGains::new(0.5, 0.2, 0.1).unwrap());
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(matches!(
            "0.5,abc,0.1".parse::<PidGains>(),
            Err(ProtocolError::InvalidGainText(_))
        ));
        assert!(matches!(
            "0.5,0.2".parse::<PidGains>(),
            Err(ProtocolError::InvalidGainText(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(PidGains::default().to_string(), "Kp=0.50, Ki=0.20, Kd=0.10");
    }
}
