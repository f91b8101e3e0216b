//! 配置管理命令
//!
//! 查看和检查场景文件

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use recede_sdk::mpc::HorizonPolicy;

use crate::scenario::Scenario;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印补全默认值后的场景配置
    Show {
        /// 场景文件
        #[arg(short, long)]
        config: PathBuf,
    },

    /// 检查场景配置
    Check {
        /// 场景文件
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { config } => Self::show_(config),

            ConfigCommand::Check { config } => Self::check_(config),
        }
    }

    fn show_(path: PathBuf) -> Result<()> {
        let scenario = Scenario::load(&path)?;
        let content = toml::to_string_pretty(&scenario).context("序列化场景失败")?;
        println!("# {}", path.display());
        println!("{}", content);
        Ok(())
    }

    fn check_(path: PathBuf) -> Result<()> {
        let scenario = Scenario::load(&path)?;
        check(&scenario)?;

        println!("配置文件: {}", path.display());
        println!("  ✅ MPC: dt = {}, mode = {:?}", scenario.mpc.dt, scenario.mpc.horizon_mode);
        println!(
            "  ✅ 时域: {}s ({} 步)",
            scenario.run.time_horizon,
            (scenario.run.time_horizon / scenario.mpc.dt).round()
        );
        println!("  ✅ 时钟: {:?}", scenario.run.clock);
        Ok(())
    }
}

/// 场景能否构建出控制器
fn check(scenario: &Scenario) -> Result<()> {
    HorizonPolicy::new(&scenario.mpc, scenario.run.time_horizon)?;
    scenario.problem(nalgebra::DVector::zeros(2))?;
    Ok(())
}
