//! 参数下发命令
//!
//! 先下发 PID 参数集，间隔配置的时间后下发目标转速，然后短暂监控设备应答。

use super::PortArgs;
use crate::config::AppConfig;
use crate::console::Console;
use crate::validation::{parse_pid, validate_rpm};
use anyhow::{Context, Result};
use clap::Args;
use pidtune_link::CancellationToken;
use std::time::Duration;

/// 下发后等待应答的时长
const RESPONSE_WINDOW: Duration = Duration::from_secs(2);

/// 参数下发命令参数
#[derive(Args, Debug)]
pub struct SendCommand {
    #[command(flatten)]
    pub port: PortArgs,

    /// PID 参数（格式 kp,ki,kd），不指定则使用配置文件 [pid]
    #[arg(long)]
    pub pid: Option<String>,

    /// 目标转速（RPM）
    #[arg(long)]
    pub rpm: i32,
}

impl SendCommand {
    pub fn execute(&self, config: &AppConfig, stop: CancellationToken) -> Result<()> {
        let gains = match &self.pid {
            Some(text) => parse_pid(text)?,
            None => config.pid.gains()?,
        };
        let rpm = validate_rpm(self.rpm)?;

        let mut console = Console::open(config, &self.port, gains, stop)?;
        println!("📤 下发 PID ({gains}) 与目标转速 {rpm} RPM...");
        let outcome = console
            .commander()
            .send_all(gains, rpm, config.link.send_gap())
            .context("下发参数失败")?;
        if outcome.is_sent() {
            println!("✅ 已下发");
        }

        console.run_until(Some(RESPONSE_WINDOW), || false);
        console.close();
        Ok(())
    }
}
