//! CLI 配置文件
//!
//! 配置保存在 `$CONFIG_DIR/pidtune/config.toml`（可用 `--config` 覆盖）。
//! 文件不存在时使用默认值，缺省字段也使用默认值。

use anyhow::{Context, Result};
use pidtune_control::SweepConfig;
use pidtune_link::LinkConfig;
use pidtune_protocol::PidGains;
use pidtune_serial::SerialConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("pidtune");
    path.push("config.toml");
    Ok(path)
}

/// 解析配置文件路径（命令行参数优先）
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

/// `[pid]` 段：初始 PID 参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidSection {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for PidSection {
    fn default() -> Self {
        let gains = PidGains::default();
        Self {
            kp: gains.kp(),
            ki: gains.ki(),
            kd: gains.kd(),
        }
    }
}

impl PidSection {
    pub fn gains(&self) -> Result<PidGains> {
        PidGains::new(self.kp, self.ki, self.kd).context("配置文件中的 [pid] 参数无效")
    }
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub link: LinkConfig,
    pub sweep: SweepConfig,
    pub pid: PidSection,
}

impl AppConfig {
    /// 加载配置（文件不存在时返回默认配置）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    /// 保存配置
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("创建配置目录失败")?;
        }
        let content = self.to_toml()?;
        fs::write(path, content).with_context(|| format!("写入配置文件失败: {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String> {
        let body = toml::to_string_pretty(self).context("序列化配置失败")?;
        Ok(format!("# PID Tune CLI Configuration\n\n{body}"))
    }
}
