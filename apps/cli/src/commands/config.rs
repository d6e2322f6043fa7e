//! 配置管理命令

use crate::config::AppConfig;
use anyhow::Result;
use clap::Subcommand;
use std::path::Path;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示生效的配置（文件不存在时为默认值）
    Show,

    /// 显示配置文件路径
    Path,

    /// 写入默认配置文件
    Init {
        /// 覆盖已存在的配置文件
        #[arg(short, long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => Self::show_(path),
            ConfigCommand::Path => {
                println!("{}", path.display());
                Ok(())
            },
            ConfigCommand::Init { force } => Self::init_(path, force),
        }
    }

    fn show_(path: &Path) -> Result<()> {
        let config = AppConfig::load(path)?;
        if !path.exists() {
            println!("# (配置文件不存在，显示默认值)");
        }
        print!("{}", config.to_toml()?);
        Ok(())
    }

    fn init_(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }
        AppConfig::default().save(path)?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }
}
