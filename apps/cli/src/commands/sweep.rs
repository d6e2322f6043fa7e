//! 转速扫描命令
//!
//! 计划在连接之前完成校验。扫描期间持续监控，Ctrl+C 取消扫描，
//! 设备保持最后一次下发的目标转速。

use super::PortArgs;
use crate::config::AppConfig;
use crate::console::Console;
use crate::validation::{parse_pid, sweep_plan};
use anyhow::{Context, Result};
use clap::Args;
use pidtune_control::{SweepOutcome, SweepSequencer};
use pidtune_link::CancellationToken;

/// 转速扫描命令参数
#[derive(Args, Debug)]
pub struct SweepCommand {
    #[command(flatten)]
    pub port: PortArgs,

    /// 起始转速（RPM）
    #[arg(long)]
    pub start: i32,

    /// 结束转速（RPM，包含）
    #[arg(long)]
    pub end: i32,

    /// 步长（RPM，可为负）
    #[arg(long, allow_hyphen_values = true)]
    pub step: i32,

    /// 每步停留时间（秒）
    #[arg(long)]
    pub interval: f64,

    /// PID 参数（格式 kp,ki,kd），不指定则使用配置文件 [pid]
    #[arg(long)]
    pub pid: Option<String>,
}

impl SweepCommand {
    pub fn execute(&self, config: &AppConfig, stop: CancellationToken) -> Result<()> {
        let plan = sweep_plan(self.start, self.end, self.step, self.interval)?;
        let gains = match &self.pid {
            Some(text) => parse_pid(text)?,
            None => config.pid.gains()?,
        };

        let mut console = Console::open(config, &self.port, gains, stop)?;
        let token = console
            .session()
            .connection_token()
            .context("链路未连接")?;
        let sequencer = SweepSequencer::new(config.sweep.clone(), console.notices());
        let handle = sequencer
            .start(plan, console.commander(), token)
            .context("无法启动扫描")?;
        println!(
            "🔁 扫描 {} 个目标: {:?}，按 Ctrl+C 停止",
            handle.targets().len(),
            handle.targets()
        );

        if console.run_until(None, || handle.is_finished()) {
            println!("\n收到退出信号，正在停止扫描...");
            handle.cancel();
        }

        let outcome = handle.join().context("扫描线程异常退出")?;
        // 取出线程结束前入队的通知
        console.tick();
        match outcome {
            SweepOutcome::Completed { steps } => println!("✅ 扫描完成（{steps} 步）"),
            SweepOutcome::Cancelled { steps } => {
                println!("🛑 扫描已停止（已下发 {steps} 步，设备保持最后目标）")
            },
        }

        console.close();
        Ok(())
    }
}
