//! 监控命令
//!
//! 只读取，不下发任何命令。

use super::PortArgs;
use crate::config::AppConfig;
use crate::console::Console;
use anyhow::Result;
use clap::Args;
use pidtune_link::CancellationToken;
use std::time::Duration;

/// 监控命令参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    #[command(flatten)]
    pub port: PortArgs,

    /// 监控时长（秒），不指定则直到 Ctrl+C
    #[arg(short, long)]
    pub seconds: Option<f64>,
}

impl MonitorCommand {
    pub fn execute(&self, config: &AppConfig, stop: CancellationToken) -> Result<()> {
        let limit = self.limit()?;
        let gains = config.pid.gains()?;

        let mut console = Console::open(config, &self.port, gains, stop)?;
        match limit {
            Some(limit) => println!("📊 监控中 ({:.1} 秒)...", limit.as_secs_f64()),
            None => println!("📊 监控中，按 Ctrl+C 停止"),
        }

        if console.run_until(limit, || false) {
            println!("\n收到退出信号，正在关闭...");
        }
        console.print_latest();
        console.close();
        Ok(())
    }

    fn limit(&self) -> Result<Option<Duration>> {
        match self.seconds {
            None => Ok(None),
            Some(secs) if secs > 0.0 => Duration::try_from_secs_f64(secs)
                .map(Some)
                .map_err(|_| anyhow::anyhow!("监控时长超出范围: {}", secs)),
            Some(secs) => anyhow::bail!("监控时长必须为正数，当前为 {}", secs),
        }
    }
}
