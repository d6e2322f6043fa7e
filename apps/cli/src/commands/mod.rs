//! 命令定义和实现

pub mod config;
pub mod monitor;
pub mod send;
pub mod stop;
pub mod sweep;

pub use config::ConfigCommand;
pub use monitor::MonitorCommand;
pub use send::SendCommand;
pub use stop::StopCommand;
pub use sweep::SweepCommand;

use clap::Args;
use pidtune_serial::SerialConfig;

/// 串口参数（覆盖配置文件）
#[derive(Args, Debug, Clone, Default)]
pub struct PortArgs {
    /// 串口路径（如 /dev/ttyUSB0、COM3）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 波特率
    #[arg(short, long)]
    pub baud: Option<u32>,
}

impl PortArgs {
    /// 合并命令行参数与配置文件（命令行参数优先）
    pub fn resolve(&self, config: &SerialConfig) -> SerialConfig {
        let mut resolved = config.clone();
        if let Some(port) = &self.port {
            resolved.port = port.clone();
        }
        if let Some(baud) = self.baud {
            resolved.baud_rate = baud;
        }
        resolved
    }
}
