//! # Recede CLI
//!
//! 滚动时域 MPC 场景的命令行工具。
//!
//! ```bash
//! # 检查场景
//! recede-cli config check --config apps/cli/config/oscillator.toml
//!
//! # 仿真时间下运行阻尼振子场景
//! recede-cli simulate --config apps/cli/config/oscillator.toml
//!
//! # 墙钟时间，JSON 汇总
//! recede-cli simulate --config apps/cli/config/oscillator.toml --clock wall --format json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod scenario;

use commands::{ConfigCommand, SimulateCommand};

/// Recede CLI - MPC 仿真命令行工具
#[derive(Parser, Debug)]
#[command(name = "recede-cli")]
#[command(about = "Command-line harness for receding-horizon MPC scenarios", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 运行 MPC 仿真
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("recede_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),

        Commands::Simulate { args } => args.execute(),
    }
}
