//! 停机命令
//!
//! 下发目标转速 0，不修改其他参数。

use super::PortArgs;
use crate::config::AppConfig;
use crate::console::Console;
use anyhow::{Context, Result};
use clap::Args;
use pidtune_link::CancellationToken;
use std::time::Duration;

/// 停机命令参数
#[derive(Args, Debug)]
pub struct StopCommand {
    #[command(flatten)]
    pub port: PortArgs,
}

impl StopCommand {
    pub fn execute(&self, config: &AppConfig, stop: CancellationToken) -> Result<()> {
        let gains = config.pid.gains()?;
        let mut console = Console::open(config, &self.port, gains, stop)?;

        println!("🛑 停止电机（目标转速 0）...");
        let outcome = console.commander().stop_motor().context("停机命令下发失败")?;
        if outcome.is_sent() {
            println!("✅ 已下发");
        }

        console.run_until(Some(Duration::from_millis(500)), || false);
        console.close();
        Ok(())
    }
}
