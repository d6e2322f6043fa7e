//! # PID Tune CLI
//!
//! 电机 PID 调参命令行工具。
//!
//! ```bash
//! # 写入默认配置（串口、链路参数、初始 PID）
//! pidtune-cli config init
//!
//! # 监控遥测 10 秒
//! pidtune-cli monitor --port /dev/ttyUSB0 --seconds 10
//!
//! # 下发 PID 与目标转速
//! pidtune-cli send --port /dev/ttyUSB0 --pid 0.8,0.1,0.05 --rpm 1200
//!
//! # 从 500 到 2000 RPM 扫描，每步 250 RPM、停留 3 秒
//! pidtune-cli sweep --port /dev/ttyUSB0 --start 500 --end 2000 --step 250 --interval 3
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pidtune_link::CancellationToken;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod console;
mod validation;

use commands::{ConfigCommand, MonitorCommand, SendCommand, StopCommand, SweepCommand};
use config::AppConfig;

/// 默认日志过滤规则（可用 RUST_LOG 覆盖）
const DEFAULT_LOG_FILTER: &str = "pidtune_cli=info,pidtune_link=info";

/// PID Tune CLI - 电机 PID 调参工具
#[derive(Parser, Debug)]
#[command(name = "pidtune-cli")]
#[command(about = "Command-line console for PID motor-controller tuning", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 $CONFIG_DIR/pidtune/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 监控设备遥测与日志
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 下发 PID 参数与目标转速
    Send {
        #[command(flatten)]
        args: SendCommand,
    },

    /// 停止电机（目标转速 0）
    Stop {
        #[command(flatten)]
        args: StopCommand,
    },

    /// 转速扫描
    Sweep {
        #[command(flatten)]
        args: SweepCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let path = config::resolve_path(cli.config.as_deref())?;

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&path),
        command => run(command, &path),
    }
}

/// 执行需要连接设备的命令
fn run(command: Commands, path: &Path) -> Result<()> {
    let config = AppConfig::load(path)?;

    // Ctrl+C 只设置停止令牌，由各命令自行收尾并断开连接
    let stop = CancellationToken::new();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.cancel()).context("设置 Ctrl+C 处理失败")?;
    }

    match command {
        Commands::Monitor { args } => args.execute(&config, stop),
        Commands::Send { args } => args.execute(&config, stop),
        Commands::Stop { args } => args.execute(&config, stop),
        Commands::Sweep { args } => args.execute(&config, stop),
        Commands::Config(cmd) => cmd.execute(path),
    }
}
