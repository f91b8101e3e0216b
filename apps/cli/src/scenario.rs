//! 场景配置
//!
//! 一个 TOML 文件描述一次完整的仿真：MPC 配置、iLQR 配置、振子参数、代价权重和运行参数。

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rand::Rng;
use recede_sdk::prelude::*;
use serde::{Deserialize, Serialize};

/// 时间来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    /// 仿真时间：每周期推进 `control_period`，求解耗时记为 0
    #[default]
    Simulated,

    /// 墙钟时间：从循环开始计时
    Wall,
}

/// 振子参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSection {
    pub w_n: f64,
    pub zeta: f64,

    /// 缺省为单位静态增益
    #[serde(default)]
    pub g_dc: Option<f64>,
}

impl Default for SystemSection {
    fn default() -> Self {
        Self {
            w_n: 10.0,
            zeta: 0.1,
            g_dc: None,
        }
    }
}

impl SystemSection {
    pub fn build(&self) -> SecondOrderSystem {
        let system = SecondOrderSystem::new(self.w_n, self.zeta);
        match self.g_dc {
            Some(g) => system.with_gain(g),
            None => system,
        }
    }
}

/// 运行参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    /// 时域长度（秒）
    pub time_horizon: f64,

    /// 初始状态，缺省时在 [-1, 1] 内随机
    pub initial_state: Option<Vec<f64>>,

    /// 最大 MPC 周期数
    pub max_runs: usize,

    /// 测量噪声幅值（均匀分布）
    pub measurement_noise: f64,

    /// 全问题离线求解的迭代次数
    pub initial_solve_iterations: usize,

    pub clock: ClockSource,

    /// 周期间隔（秒）：仿真时间下为时间步进，墙钟时间下为节拍（0 表示不节拍）
    pub control_period: f64,

    pub seed: Option<u64>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            time_horizon: 3.0,
            initial_state: None,
            max_runs: 2000,
            measurement_noise: 0.1,
            initial_solve_iterations: 50,
            clock: ClockSource::Simulated,
            control_period: 0.002,
            seed: None,
        }
    }
}

/// 场景文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub mpc: MpcSettings,

    #[serde(default)]
    pub ilqr: IlqrSettings,

    #[serde(default)]
    pub system: SystemSection,

    pub cost: QuadraticCostConfig,

    #[serde(default, rename = "scenario")]
    pub run: RunSection,
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(content).context("解析场景文件失败")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取场景文件失败: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.mpc.validate()?;
        let run = &self.run;
        if !run.time_horizon.is_finite() || run.time_horizon <= 0.0 {
            bail!("time_horizon must be positive, got {}", run.time_horizon);
        }
        if !run.control_period.is_finite() || run.control_period < 0.0 {
            bail!("control_period must be non-negative, got {}", run.control_period);
        }
        if run.clock == ClockSource::Simulated && run.control_period == 0.0 {
            bail!("control_period must be positive with the simulated clock");
        }
        if !run.measurement_noise.is_finite() || run.measurement_noise < 0.0 {
            bail!(
                "measurement_noise must be non-negative, got {}",
                run.measurement_noise
            );
        }
        if let Some(x0) = &run.initial_state
            && x0.len() != SecondOrderSystem::STATE_DIM
        {
            bail!(
                "initial_state must have {} entries, got {}",
                SecondOrderSystem::STATE_DIM,
                x0.len()
            );
        }
        Ok(())
    }

    /// 初始状态：配置值或随机值
    pub fn initial_state<R: Rng>(&self, rng: &mut R) -> StateVector {
        match &self.run.initial_state {
            Some(x0) => StateVector::from_column_slice(x0),
            None => StateVector::from_fn(SecondOrderSystem::STATE_DIM, |_, _| {
                rng.gen_range(-1.0..=1.0)
            }),
        }
    }

    /// 构建最优控制问题
    pub fn problem(&self, initial_state: StateVector) -> Result<Problem> {
        let cost = QuadraticCost::from_config(&self.cost)?;
        let problem = Problem::new(
            Arc::new(self.system.build()),
            cost,
            initial_state,
            self.run.time_horizon,
        )?;
        Ok(problem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io::Write;

    const BUNDLED: &str = include_str!("../config/oscillator.toml");

    #[test]
    fn test_bundled_scenario_is_valid() {
        let scenario = Scenario::from_toml_str(BUNDLED).unwrap();
        assert_eq!(scenario.mpc.dt, 0.001);
        assert_eq!(scenario.mpc.max_iterations, 5);
        assert_eq!(scenario.run.time_horizon, 3.0);
        assert_eq!(scenario.run.max_runs, 2000);
        assert_eq!(scenario.run.clock, ClockSource::Simulated);
        assert_eq!(scenario.run.seed, Some(42));

        let mut rng = StdRng::seed_from_u64(1);
        let x0 = scenario.initial_state(&mut rng);
        assert!(x0.iter().all(|v| (-1.0..=1.0).contains(v)));
        let problem = scenario.problem(x0).unwrap();
        assert_eq!(problem.state_dim(), 2);
        assert_eq!(problem.control_dim(), 1);
    }

    #[test]
    fn test_minimal_scenario_uses_defaults() {
        let scenario = Scenario::from_toml_str(
            r#"
            [cost]
            q_diag = [1.0, 1.0]
            r_diag = [1.0]
            q_final_diag = [1.0, 1.0]

            [scenario]
            initial_state = [0.5, -0.5]
            "#,
        )
        .unwrap();
        assert_eq!(scenario.mpc, MpcSettings::default());
        assert_eq!(scenario.system.w_n, 10.0);
        assert_eq!(scenario.run.control_period, 0.002);

        let mut rng = StdRng::seed_from_u64(1);
        let x0 = scenario.initial_state(&mut rng);
        assert_eq!(x0.as_slice(), &[0.5, -0.5]);
    }

    #[test]
    fn test_invalid_scenarios() {
        let base = "[cost]\nq_diag = [1.0, 1.0]\nr_diag = [1.0]\nq_final_diag = [1.0, 1.0]\n";
        for extra in [
            "[scenario]\ntime_horizon = -1.0\n",
            "[scenario]\ninitial_state = [1.0]\n",
            "[scenario]\nmeasurement_noise = -0.1\n",
            "[scenario]\ncontrol_period = 0.0\n",
            "[mpc]\ndt = 0.0\n",
        ] {
            let content = format!("{}{}", base, extra);
            assert!(Scenario::from_toml_str(&content).is_err(), "{}", extra);
        }
        assert!(Scenario::from_toml_str("[scenario]\nmax_runs = 1\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BUNDLED.as_bytes()).unwrap();
        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.system.zeta, 0.1);
        assert!(Scenario::load("/nonexistent/scenario.toml").is_err());
    }
}
