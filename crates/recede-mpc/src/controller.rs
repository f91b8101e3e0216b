//! # MPC 控制器
//!
//! 每次 [`MpcController::run`] 执行一个周期：
//!
//! ```text
//! (状态, 时间) → 延迟估计 → 时域更新 → 状态前向积分 → 热启动
//!              → 优化 → 后截断 → 输出策略 → 周期记录
//! ```
//!
//! 优化失败不是 `run()` 的错误：输出 `success = false`，并返回上一个成功的策略
//! （第一个周期就失败时返回初始猜测）。
//!
//! # 使用示例
//!
//! ```rust,no_run
//! use recede_mpc::{MpcController, MpcSettings};
//! # use recede_optcon::{IlqrSolver, Problem};
//! # fn problem() -> Problem { unimplemented!() }
//! # fn measure() -> nalgebra::DVector<f64> { unimplemented!() }
//! # fn now() -> f64 { 0.0 }
//!
//! let mut mpc = MpcController::new(
//!     MpcSettings::default(),
//!     problem(),
//!     Box::new(IlqrSolver::default()),
//! )?;
//!
//! while !mpc.time_horizon_reached() {
//!     let output = mpc.run(&measure(), now())?;
//!     // 把 output.policy 交给被控对象执行
//! }
//! mpc.print_mpc_summary();
//! # Ok::<(), recede_mpc::MpcError>(())
//! ```

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use recede_optcon::{
    OptimizerError, Problem, Solution, SolveBudget, TrajectoryOptimizer, simulate_policy,
};
use recede_types::{
    Clock, CycleOutcome, CycleRecord, Deadline, MpcSummary, Policy, StateVector, SystemClock,
    TIME_EPSILON, Trajectory,
};
use tracing::{debug, info, warn};

use crate::delay::DelayEstimator;
use crate::error::{MpcError, Result};
use crate::horizon::HorizonPolicy;
use crate::phase::{AtomicMpcPhase, MpcPhase};
use crate::settings::MpcSettings;
use crate::warm_start::WarmStartTransformer;

/// 单周期输出
#[derive(Debug, Clone, PartialEq)]
pub struct MpcOutput {
    /// 本周期优化是否成功
    pub success: bool,

    /// 被控对象应执行的策略（失败时为上一成功策略）
    pub policy: Policy,

    /// 策略起始时间戳（等于 `policy.t0()`）
    pub policy_timestamp: f64,

    /// 时域是否已到达
    pub horizon_reached: bool,
}

/// 滚动时域 MPC 控制器
pub struct MpcController {
    settings: MpcSettings,
    problem: Problem,
    optimizer: Box<dyn TrajectoryOptimizer>,
    clock: Arc<dyn Clock>,

    horizon: HorizonPolicy,
    delay: DelayEstimator,
    warm_start: WarmStartTransformer,

    phase: MpcPhase,
    phase_monitor: Arc<AtomicMpcPhase>,

    previous_policy: Option<Policy>,
    previous_trajectory: Option<Trajectory>,
    last_time: Option<f64>,

    records: Vec<CycleRecord>,
    next_cycle: u64,
}

impl std::fmt::Debug for MpcController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpcController")
            .field("optimizer", &self.optimizer.name())
            .field("phase", &self.phase)
            .field("horizon", &self.horizon)
            .field("cycles", &self.records.len())
            .finish()
    }
}

impl MpcController {
    /// 使用系统时钟创建控制器
    pub fn new(
        settings: MpcSettings,
        problem: Problem,
        optimizer: Box<dyn TrajectoryOptimizer>,
    ) -> Result<Self> {
        Self::with_clock(settings, problem, optimizer, Arc::new(SystemClock::new()))
    }

    /// 使用指定时钟创建控制器（测试与离线仿真用 `ManualClock`）
    ///
    /// 时域长度取自 `problem.time_horizon()`。
    pub fn with_clock(
        settings: MpcSettings,
        problem: Problem,
        optimizer: Box<dyn TrajectoryOptimizer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        settings.validate()?;
        let horizon = HorizonPolicy::new(&settings, problem.time_horizon())?;
        let delay = DelayEstimator::from_settings(&settings);
        let warm_start = WarmStartTransformer::new(settings.dt, settings.tail_extension);

        info!(
            "MPC controller created: optimizer={}, mode={:?}, horizon={}s, dt={}",
            optimizer.name(),
            settings.horizon_mode,
            horizon.horizon(),
            settings.dt
        );

        Ok(Self {
            settings,
            problem,
            optimizer,
            clock,
            horizon,
            delay,
            warm_start,
            phase: MpcPhase::Idle,
            phase_monitor: Arc::new(AtomicMpcPhase::new(MpcPhase::Idle)),
            previous_policy: None,
            previous_trajectory: None,
            last_time: None,
            records: Vec::new(),
            next_cycle: 0,
        })
    }

    /// 用外部求得的解作为第一次热启动
    ///
    /// # 错误
    ///
    /// - `TerminalState`: 控制器已终止
    /// - `Configuration`: 步长与配置不一致，或策略为空
    /// - `DimensionMismatch`: 轨迹状态维度与问题不一致
    pub fn set_initial_guess(&mut self, policy: Policy, trajectory: Option<Trajectory>) -> Result<()> {
        if self.phase.is_terminated() {
            return Err(MpcError::TerminalState);
        }
        if policy.is_empty() {
            return Err(MpcError::Configuration("initial guess policy is empty".to_string()));
        }
        if (policy.dt() - self.settings.dt).abs() > TIME_EPSILON {
            return Err(MpcError::Configuration(format!(
                "initial guess dt {} differs from configured dt {}",
                policy.dt(),
                self.settings.dt
            )));
        }
        if let Some(m) = policy.control_dim()
            && m != self.problem.control_dim()
        {
            return Err(MpcError::Configuration(format!(
                "initial guess control dimension {} differs from problem {}",
                m,
                self.problem.control_dim()
            )));
        }
        if let Some(traj) = &trajectory {
            if traj.state_dim() != self.problem.state_dim() {
                return Err(MpcError::DimensionMismatch {
                    expected: self.problem.state_dim(),
                    actual: traj.state_dim(),
                });
            }
            if (traj.dt() - self.settings.dt).abs() > TIME_EPSILON {
                return Err(MpcError::Configuration(format!(
                    "initial guess trajectory dt {} differs from configured dt {}",
                    traj.dt(),
                    self.settings.dt
                )));
            }
        }

        debug!(
            "Initial guess set: {} steps starting at t = {:.6}",
            policy.len(),
            policy.t0()
        );
        self.previous_policy = Some(policy);
        self.previous_trajectory = trajectory;
        Ok(())
    }

    /// 执行一个 MPC 周期
    ///
    /// # 错误
    ///
    /// - `TerminalState`: 已终止，需要先 `reset()`
    /// - `DimensionMismatch`: 测量状态维度错误（不修改任何状态）
    /// - `OrderingViolation`: 时间早于上一次调用（不修改任何状态）
    pub fn run(&mut self, measured_state: &StateVector, current_time: f64) -> Result<MpcOutput> {
        if self.phase.is_terminated() {
            return Err(MpcError::TerminalState);
        }
        if measured_state.len() != self.problem.state_dim() {
            return Err(MpcError::DimensionMismatch {
                expected: self.problem.state_dim(),
                actual: measured_state.len(),
            });
        }
        if !current_time.is_finite() {
            return Err(MpcError::Configuration(format!(
                "current time must be finite, got {}",
                current_time
            )));
        }
        if let Some(previous) = self.last_time
            && current_time < previous
        {
            return Err(MpcError::OrderingViolation {
                previous,
                current: current_time,
            });
        }

        // 1. 延迟估计
        let tau = self.delay.estimate();
        let policy_start = current_time + tau;

        // 2. 时域更新：步数从策略起点算起
        self.horizon.anchor_at(current_time);
        self.last_time = Some(current_time);
        let steps = self.horizon.steps(policy_start);
        if steps == 0 || self.horizon.is_reached(current_time) {
            return Ok(self.terminate(current_time));
        }
        self.set_phase(MpcPhase::Running);

        // 3. 状态前向积分
        let projected = match &self.previous_policy {
            Some(previous) if self.settings.state_forward_integration && tau > TIME_EPSILON => {
                simulate_policy(
                    self.problem.system().as_ref(),
                    previous,
                    measured_state,
                    current_time,
                    tau,
                    self.settings.integration_substeps,
                )
            },
            _ => measured_state.clone(),
        };

        // 4. 热启动
        let warm_started = !self.settings.cold_start && self.previous_policy.is_some();
        let mut guess = if warm_started {
            let elapsed = self
                .previous_policy
                .as_ref()
                .map_or(0.0, |p| policy_start - p.t0());
            self.warm_start.transform(
                &self.problem,
                self.previous_policy.as_ref(),
                self.previous_trajectory.as_ref(),
                &projected,
                elapsed,
                steps,
            )?
        } else {
            self.warm_start.default_guess(&self.problem, &projected, steps)?
        };
        guess.policy.set_t0(policy_start);
        if let Some(traj) = &mut guess.trajectory {
            traj.set_t0(policy_start);
        }

        // 5. 优化
        self.problem
            .set_initial_state(projected)
            .and_then(|_| self.problem.set_time_horizon(steps as f64 * self.settings.dt))
            .map_err(|e| MpcError::Configuration(e.to_string()))?;

        let deadline = self.settings.deadline();
        let budget = SolveBudget {
            max_iterations: self.settings.max_iterations,
            deadline: deadline.map(|d| Deadline::after(self.clock.clone(), d)),
        };
        let started = self.clock.now();
        let result = self.optimizer.solve(&self.problem, &guess, &budget);
        let optimize_duration = self.clock.now().saturating_sub(started);
        let optimize_secs = optimize_duration.as_secs_f64();
        self.delay.record(optimize_secs);

        // 6. 后处理
        let (outcome, accepted) = Self::classify(result, optimize_duration, deadline);
        let mut truncated_steps = 0;
        let output = match accepted {
            Some(solution) => {
                let mut policy = solution.policy;
                let mut trajectory = solution.trajectory;
                policy.set_t0(policy_start);
                trajectory.set_t0(policy_start);

                if self.settings.post_truncation && !policy.is_empty() {
                    let completion = current_time + optimize_secs;
                    let elapsed_steps = ((completion - policy_start) / self.settings.dt - TIME_EPSILON)
                        .ceil()
                        .max(0.0) as usize;
                    truncated_steps = policy.truncate_front(elapsed_steps.min(policy.len() - 1));
                    trajectory.truncate_front(truncated_steps);
                }

                self.previous_policy = Some(policy.clone());
                self.previous_trajectory = Some(trajectory);
                MpcOutput {
                    success: true,
                    policy_timestamp: policy.t0(),
                    policy,
                    horizon_reached: false,
                }
            },
            None => {
                warn!(
                    "MPC cycle {} at t = {:.6} failed ({:?}), keeping previous policy",
                    self.next_cycle, current_time, outcome
                );
                let policy = self
                    .previous_policy
                    .clone()
                    .unwrap_or_else(|| guess.policy.clone());
                MpcOutput {
                    success: false,
                    policy_timestamp: policy.t0(),
                    policy,
                    horizon_reached: false,
                }
            },
        };

        // 7. 周期记录
        let record = CycleRecord {
            cycle: self.next_cycle,
            current_time,
            optimize_duration_us: u64::try_from(optimize_duration.as_micros()).unwrap_or(u64::MAX),
            delay: tau,
            warm_started,
            outcome,
            truncated_steps,
            policy_steps: output.policy.len(),
        };
        debug!(
            "MPC cycle {}: t = {:.6}, tau = {:.6}, steps = {}, optimize = {}us, truncated = {}, success = {}",
            record.cycle,
            current_time,
            tau,
            steps,
            record.optimize_duration_us,
            truncated_steps,
            output.success
        );
        self.records.push(record);
        self.next_cycle += 1;

        Ok(output)
    }

    /// 按优化结果判定周期结局，成功时返回解
    fn classify(
        result: std::result::Result<Solution, OptimizerError>,
        elapsed: Duration,
        deadline: Option<Duration>,
    ) -> (CycleOutcome, Option<Solution>) {
        let overrun_us = |deadline: Duration| {
            u64::try_from(elapsed.saturating_sub(deadline).as_micros()).unwrap_or(u64::MAX)
        };
        match result {
            Ok(_) if deadline.is_some_and(|d| elapsed > d) => {
                let overrun_us = deadline.map_or(0, overrun_us);
                (CycleOutcome::DeadlineMissed { overrun_us }, None)
            },
            Ok(solution) if solution.converged => (
                CycleOutcome::Converged {
                    iterations: solution.iterations,
                },
                Some(solution),
            ),
            Ok(solution) => (
                CycleOutcome::NotConverged {
                    iterations: solution.iterations,
                },
                None,
            ),
            Err(OptimizerError::DeadlineExceeded { .. }) => {
                let overrun_us = deadline.map_or(0, overrun_us);
                (CycleOutcome::DeadlineMissed { overrun_us }, None)
            },
            Err(e) => (
                CycleOutcome::Rejected {
                    reason: e.to_string(),
                },
                None,
            ),
        }
    }

    fn terminate(&mut self, current_time: f64) -> MpcOutput {
        self.set_phase(MpcPhase::Terminated);
        info!(
            "MPC time horizon reached at t = {:.6} after {} cycles",
            current_time,
            self.records.len()
        );
        let policy = self.previous_policy.clone().unwrap_or_else(|| {
            Policy::zeros(
                0,
                self.problem.state_dim(),
                self.problem.control_dim(),
                self.settings.dt,
                current_time,
            )
        });
        MpcOutput {
            success: true,
            policy_timestamp: policy.t0(),
            policy,
            horizon_reached: true,
        }
    }

    fn set_phase(&mut self, phase: MpcPhase) {
        self.phase = phase;
        self.phase_monitor.set(phase, Ordering::Release);
    }

    /// 回到 `Idle`，清除上一策略，可选地修改时域长度
    ///
    /// 周期记录保留。
    pub fn reset(&mut self, new_horizon: Option<f64>) -> Result<()> {
        self.horizon.reset(new_horizon)?;
        if let Some(horizon) = new_horizon {
            self.problem
                .set_time_horizon(horizon)
                .map_err(|e| MpcError::Configuration(e.to_string()))?;
        }
        self.previous_policy = None;
        self.previous_trajectory = None;
        self.last_time = None;
        self.delay.reset();
        self.set_phase(MpcPhase::Idle);
        info!("MPC controller reset (horizon {}s)", self.horizon.horizon());
        Ok(())
    }

    /// 时域是否已到达（单调，直到 `reset()`）
    pub fn time_horizon_reached(&self) -> bool {
        self.phase.is_terminated()
    }

    /// 配置的时域长度（秒）
    pub fn time_horizon(&self) -> f64 {
        self.horizon.horizon()
    }

    pub fn phase(&self) -> MpcPhase {
        self.phase
    }

    /// 阶段的原子镜像，可交给监控线程
    pub fn phase_monitor(&self) -> Arc<AtomicMpcPhase> {
        self.phase_monitor.clone()
    }

    /// 最近一次成功的策略
    pub fn latest_policy(&self) -> Option<Policy> {
        self.previous_policy.clone()
    }

    /// 最近一次成功的预测状态轨迹
    pub fn state_trajectory(&self) -> Option<Trajectory> {
        self.previous_trajectory.clone()
    }

    pub fn cycle_records(&self) -> &[CycleRecord] {
        &self.records
    }

    pub fn settings(&self) -> &MpcSettings {
        &self.settings
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn summary(&self) -> MpcSummary {
        MpcSummary::calculate(&self.records)
    }

    /// 打印汇总统计
    pub fn print_mpc_summary(&self) {
        println!("{}", self.summary());
    }
}
