//! 仿真命令
//!
//! 1. 用 iLQR 离线求解完整问题
//! 2. 以该解作为 MPC 的初始猜测
//! 3. 循环：测量状态 = 预测轨迹首状态 + 噪声，运行一个 MPC 周期
//! 4. 时域到达、优化失败、达到最大周期数或 Ctrl-C 时停止，打印汇总

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use recede_sdk::prelude::*;
use tracing::{info, warn};

use crate::scenario::{ClockSource, Scenario};

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// 仿真命令参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 场景文件
    #[arg(short, long)]
    pub config: PathBuf,

    /// 覆盖最大周期数
    #[arg(long)]
    pub max_runs: Option<usize>,

    /// 覆盖时间来源
    #[arg(long, value_enum)]
    pub clock: Option<ClockSource>,

    /// 覆盖随机种子
    #[arg(long)]
    pub seed: Option<u64>,

    /// 汇总输出格式
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// 一次仿真的结果
#[derive(Debug, serde::Serialize)]
struct SimulationReport {
    runs: usize,
    stop_reason: StopReason,
    initial_cost: f64,
    final_state: Vec<f64>,
    summary: MpcSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
enum StopReason {
    HorizonReached,
    OptimizationFailed,
    MaxRuns,
    Interrupted,
}

impl SimulateCommand {
    pub fn execute(&self) -> Result<()> {
        let mut scenario = Scenario::load(&self.config)?;
        if let Some(max_runs) = self.max_runs {
            scenario.run.max_runs = max_runs;
        }
        if let Some(clock) = self.clock {
            scenario.run.clock = clock;
        }
        if self.seed.is_some() {
            scenario.run.seed = self.seed;
        }
        scenario.validate()?;

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })
        .context("设置 Ctrl-C 处理失败")?;

        let report = simulate(&scenario, &running)?;
        match self.format {
            OutputFormat::Text => {
                println!(
                    "runs: {}, stop: {:?}, initial cost: {:.6e}, final state: {:?}",
                    report.runs, report.stop_reason, report.initial_cost, report.final_state
                );
                println!("{}", report.summary);
            },
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
            },
        }
        Ok(())
    }
}

fn simulate(scenario: &Scenario, running: &AtomicBool) -> Result<SimulationReport> {
    let run = &scenario.run;
    let dt = scenario.mpc.dt;
    let mut rng = match run.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // 离线求解完整问题
    let x0 = scenario.initial_state(&mut rng);
    let problem = scenario.problem(x0.clone())?;
    let steps = (run.time_horizon / dt).round() as usize;
    let mut solver = IlqrSolver::new(scenario.ilqr.clone());
    let guess = WarmStart::from_policy(Policy::zeros(
        steps,
        problem.state_dim(),
        problem.control_dim(),
        dt,
        0.0,
    ));
    let initial = solver
        .solve(
            &problem,
            &guess,
            &SolveBudget::iterations(run.initial_solve_iterations),
        )
        .context("离线求解失败")?;
    info!(
        "Initial solve: {} iterations, cost {:.6e}, converged {}",
        initial.iterations, initial.cost, initial.converged
    );
    let initial_cost = initial.cost;

    // MPC
    let optimizer = Box::new(IlqrSolver::new(scenario.ilqr.clone()));
    let manual = Arc::new(ManualClock::new());
    let mut mpc = match run.clock {
        ClockSource::Simulated => MpcController::with_clock(
            scenario.mpc.clone(),
            problem,
            optimizer,
            manual.clone(),
        )?,
        ClockSource::Wall => MpcController::new(scenario.mpc.clone(), problem, optimizer)?,
    };
    mpc.set_initial_guess(initial.policy, Some(initial.trajectory))?;

    let period = Duration::from_secs_f64(run.control_period);
    let start = Instant::now();
    let mut measured = x0;
    let mut runs = 0;
    let mut stop_reason = StopReason::MaxRuns;

    for i in 0..run.max_runs {
        if !running.load(Ordering::SeqCst) {
            stop_reason = StopReason::Interrupted;
            break;
        }

        if i > 0
            && let Some(traj) = mpc.state_trajectory()
        {
            let noise = run.measurement_noise;
            measured = traj.front() + StateVector::from_fn(traj.state_dim(), |_, _| {
                noise * rng.gen_range(-1.0..=1.0)
            });
        }

        let t = match run.clock {
            ClockSource::Simulated => {
                let t = i as f64 * run.control_period;
                manual.set(Duration::from_secs_f64(t));
                t
            },
            ClockSource::Wall => start.elapsed().as_secs_f64(),
        };

        let cycle_start = Instant::now();
        let output = mpc.run(&measured, t)?;
        if output.horizon_reached {
            stop_reason = StopReason::HorizonReached;
            break;
        }
        runs += 1;
        if !output.success {
            warn!("Optimization failed at t = {:.6}", t);
            stop_reason = StopReason::OptimizationFailed;
            break;
        }

        if run.clock == ClockSource::Wall && !period.is_zero() {
            let spent = cycle_start.elapsed();
            if spent < period {
                spin_sleep::sleep(period - spent);
            }
        }
    }

    info!("MPC loop stopped after {} runs ({:?})", runs, stop_reason);
    Ok(SimulationReport {
        runs,
        stop_reason,
        initial_cost,
        final_state: measured.iter().copied().collect(),
        summary: mpc.summary(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_scenario() -> Scenario {
        let mut scenario = Scenario::from_toml_str(
            r#"
            [mpc]
            dt = 0.01
            [cost]
            q_diag = [10.0, 1.0]
            r_diag = [0.1]
            q_final_diag = [100.0, 10.0]
            x_ref = [1.0, 0.0]
            [scenario]
            time_horizon = 0.5
            initial_state = [0.0, 0.0]
            measurement_noise = 0.0
            control_period = 0.05
            seed = 7
            "#,
        )
        .unwrap();
        scenario.run.max_runs = 100;
        scenario
    }

    #[test]
    fn test_simulated_run_reaches_horizon() {
        let running = AtomicBool::new(true);
        let report = simulate(&short_scenario(), &running).unwrap();
        assert_eq!(report.stop_reason, StopReason::HorizonReached);
        assert_eq!(report.runs, 10);
        assert_eq!(report.summary.total_cycles, 10);
        assert_eq!(report.summary.failed_cycles, 0);
        assert!(report.initial_cost.is_finite());
    }

    #[test]
    fn test_max_runs_and_interrupt() {
        let mut scenario = short_scenario();
        scenario.run.max_runs = 3;
        let running = AtomicBool::new(true);
        let report = simulate(&scenario, &running).unwrap();
        assert_eq!(report.stop_reason, StopReason::MaxRuns);
        assert_eq!(report.runs, 3);

        let stopped = AtomicBool::new(false);
        let report = simulate(&short_scenario(), &stopped).unwrap();
        assert_eq!(report.stop_reason, StopReason::Interrupted);
        assert_eq!(report.runs, 0);
    }

    #[test]
    fn test_report_serializes() {
        let mut scenario = short_scenario();
        scenario.run.max_runs = 2;
        let report = simulate(&scenario, &AtomicBool::new(true)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stop_reason"], "max_runs");
        assert_eq!(json["summary"]["total_cycles"], 2);
    }
}
