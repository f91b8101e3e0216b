//! # 迭代 LQR 求解器
//!
//! 参考后端。每次迭代：
//!
//! 1. 截止时间检查（超时直接放弃本次求解）
//! 2. 反向传播：沿名义轨迹线性化离散动力学，Riccati 递推得到前馈修正 `k` 与反馈增益 `K`
//! 3. 前向线搜索：`u = ū + α·k + K·(x − x̄)`，代价下降即接受
//!
//! 预期下降量或实际相对下降量低于 `convergence_tolerance` 时判定收敛。
//!
//! 输出策略以绝对状态表示反馈律：`u_ff = ū − K·x̄`，因此 `u = u_ff + K·x`。

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::OptimizerError;
use crate::integrator::rk4_step;
use crate::linearize::linearize_discrete;
use crate::optimizer::{SolveBudget, Solution, TrajectoryOptimizer, WarmStart};
use crate::problem::Problem;
use recede_types::{ControlVector, FeedbackMatrix, Policy, StateVector, Trajectory};

/// iLQR 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IlqrSettings {
    /// 相对代价下降收敛阈值
    pub convergence_tolerance: f64,

    /// 线搜索步长收缩因子
    pub line_search_shrink: f64,

    /// 线搜索最大尝试次数
    pub max_line_search_steps: usize,

    /// 初始 Levenberg-Marquardt 正则化
    pub initial_regularization: f64,

    /// 正则化上限，超过即判定数值失败
    pub max_regularization: f64,

    /// 正则化放大倍数
    pub regularization_factor: f64,

    /// 有限差分步长
    pub fd_step: f64,
}

impl Default for IlqrSettings {
    fn default() -> Self {
        Self {
            convergence_tolerance: 1e-6,
            line_search_shrink: 0.5,
            max_line_search_steps: 10,
            initial_regularization: 1e-6,
            max_regularization: 1e10,
            regularization_factor: 10.0,
            fd_step: 1e-6,
        }
    }
}

/// 反向传播结果
struct BackwardPass {
    k_ff: Vec<ControlVector>,
    gains: Vec<FeedbackMatrix>,
    /// 预期代价下降量（非负）
    expected_reduction: f64,
}

/// 名义轨迹
struct Nominal {
    xs: Vec<StateVector>,
    us: Vec<ControlVector>,
    cost: f64,
}

/// 迭代 LQR 求解器
#[derive(Debug, Clone, Default)]
pub struct IlqrSolver {
    settings: IlqrSettings,
}

impl IlqrSolver {
    pub fn new(settings: IlqrSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &IlqrSettings {
        &self.settings
    }

    fn validate(problem: &Problem, policy: &Policy) -> Result<(), OptimizerError> {
        if policy.is_empty() {
            return Err(OptimizerError::InvalidProblem(
                "initial guess has no steps".to_string(),
            ));
        }
        if let Some(m) = policy.control_dim()
            && m != problem.control_dim()
        {
            return Err(OptimizerError::DimensionMismatch {
                what: "guess control",
                expected: problem.control_dim(),
                actual: m,
            });
        }
        if let Some(gains) = policy.feedback()
            && let Some(bad) = gains.iter().find(|k| k.ncols() != problem.state_dim())
        {
            return Err(OptimizerError::DimensionMismatch {
                what: "guess feedback",
                expected: problem.state_dim(),
                actual: bad.ncols(),
            });
        }
        let grid = policy.duration();
        if (problem.time_horizon() - grid).abs() > 0.5 * policy.dt() {
            return Err(OptimizerError::InvalidProblem(format!(
                "time horizon {} does not match guess grid {} ({} steps of {})",
                problem.time_horizon(),
                grid,
                policy.len(),
                policy.dt()
            )));
        }
        problem.check_feasible()
    }

    fn total_cost(problem: &Problem, xs: &[StateVector], us: &[ControlVector], dt: f64) -> f64 {
        let cost = problem.cost();
        let running: f64 = xs
            .iter()
            .zip(us.iter())
            .map(|(x, u)| cost.stage(x, u) * dt)
            .sum();
        running + cost.terminal(&xs[xs.len() - 1])
    }

    /// 按初始猜测的闭环控制律展开
    fn initial_rollout(problem: &Problem, policy: &Policy) -> Result<Nominal, OptimizerError> {
        let system = problem.system().as_ref();
        let dt = policy.dt();
        let mut xs = Vec::with_capacity(policy.len() + 1);
        let mut us = Vec::with_capacity(policy.len());
        let mut x = problem.initial_state().clone();

        for k in 0..policy.len() {
            let mut u = policy.feedforward()[k].clone();
            if let Some(gains) = policy.feedback() {
                u += &gains[k] * &x;
            }
            let next = rk4_step(system, &x, &u, policy.t0() + k as f64 * dt, dt);
            xs.push(x);
            us.push(u);
            x = next;
        }
        xs.push(x);

        let cost = Self::total_cost(problem, &xs, &us, dt);
        if !cost.is_finite() {
            return Err(OptimizerError::NumericalFailure(
                "initial guess rollout diverged".to_string(),
            ));
        }
        Ok(Nominal { xs, us, cost })
    }

    fn backward_pass(
        &self,
        problem: &Problem,
        nominal: &Nominal,
        t0: f64,
        dt: f64,
        regularization: f64,
    ) -> Option<BackwardPass> {
        let system = problem.system().as_ref();
        let cost = problem.cost();
        let steps = nominal.us.len();
        let m = problem.control_dim();

        let mut vx = cost.terminal_grad(&nominal.xs[steps]);
        let mut vxx = cost.q_final().clone();
        let mut k_ff = vec![ControlVector::zeros(m); steps];
        let mut gains = vec![FeedbackMatrix::zeros(m, problem.state_dim()); steps];
        let mut expected_reduction = 0.0;

        for k in (0..steps).rev() {
            let x = &nominal.xs[k];
            let u = &nominal.us[k];
            let (a, b) =
                linearize_discrete(system, x, u, t0 + k as f64 * dt, dt, self.settings.fd_step);

            let qx = cost.stage_grad_x(x) * dt + a.tr_mul(&vx);
            let qu = cost.stage_grad_u(u) * dt + b.tr_mul(&vx);
            let vxx_a = &vxx * &a;
            let qxx = cost.q() * dt + a.tr_mul(&vxx_a);
            let qux = b.tr_mul(&vxx_a);
            let quu = cost.r() * dt
                + b.tr_mul(&(&vxx * &b))
                + DMatrix::identity(m, m) * regularization;

            let chol = quu.clone().cholesky()?;
            let kk = -chol.solve(&qu);
            let big_k = -chol.solve(&qux);

            expected_reduction -= kk.dot(&qu) + 0.5 * kk.dot(&(&quu * &kk));

            vx = &qx + big_k.tr_mul(&(&quu * &kk)) + big_k.tr_mul(&qu) + qux.tr_mul(&kk);
            vxx = &qxx + big_k.tr_mul(&(&quu * &big_k)) + big_k.tr_mul(&qux) + qux.tr_mul(&big_k);
            vxx = (&vxx + vxx.transpose()) * 0.5;

            k_ff[k] = kk;
            gains[k] = big_k;
        }

        Some(BackwardPass {
            k_ff,
            gains,
            expected_reduction: expected_reduction.max(0.0),
        })
    }

    fn forward_pass(
        problem: &Problem,
        nominal: &Nominal,
        pass: &BackwardPass,
        alpha: f64,
        t0: f64,
        dt: f64,
    ) -> Option<Nominal> {
        let system = problem.system().as_ref();
        let steps = nominal.us.len();
        let mut xs = Vec::with_capacity(steps + 1);
        let mut us = Vec::with_capacity(steps);
        let mut x = problem.initial_state().clone();

        for k in 0..steps {
            let u = &nominal.us[k] + &pass.k_ff[k] * alpha + &pass.gains[k] * (&x - &nominal.xs[k]);
            let next = rk4_step(system, &x, &u, t0 + k as f64 * dt, dt);
            if next.iter().any(|v| !v.is_finite()) {
                return None;
            }
            xs.push(x);
            us.push(u);
            x = next;
        }
        xs.push(x);

        let cost = Self::total_cost(problem, &xs, &us, dt);
        cost.is_finite().then_some(Nominal { xs, us, cost })
    }

    fn build_solution(
        nominal: Nominal,
        gains: Option<Vec<FeedbackMatrix>>,
        guess: &Policy,
        converged: bool,
        iterations: usize,
    ) -> Result<Solution, OptimizerError> {
        let (feedforward, feedback) = match gains {
            Some(gains) => {
                let ff = nominal
                    .us
                    .iter()
                    .zip(nominal.xs.iter())
                    .zip(gains.iter())
                    .map(|((u, x), k)| u - k * x)
                    .collect();
                (ff, Some(gains))
            },
            None => (
                guess.feedforward().to_vec(),
                guess.feedback().map(<[FeedbackMatrix]>::to_vec),
            ),
        };

        let policy = Policy::new(guess.t0(), guess.dt(), feedforward, feedback)?;
        let trajectory = Trajectory::new(guess.t0(), guess.dt(), nominal.xs)?;
        Ok(Solution {
            policy,
            trajectory,
            converged,
            iterations,
            cost: nominal.cost,
        })
    }
}

impl TrajectoryOptimizer for IlqrSolver {
    fn name(&self) -> &str {
        "ilqr"
    }

    fn solve(
        &mut self,
        problem: &Problem,
        guess: &WarmStart,
        budget: &SolveBudget,
    ) -> Result<Solution, OptimizerError> {
        let policy = &guess.policy;
        Self::validate(problem, policy)?;

        let t0 = policy.t0();
        let dt = policy.dt();
        let tol = self.settings.convergence_tolerance;
        let mut nominal = Self::initial_rollout(problem, policy)?;
        let mut gains: Option<Vec<FeedbackMatrix>> = None;
        let mut regularization = self.settings.initial_regularization;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < budget.max_iterations {
            if budget.expired() {
                debug!("iLQR deadline exceeded after {} iterations", iterations);
                return Err(OptimizerError::DeadlineExceeded { iterations });
            }
            iterations += 1;

            let pass = loop {
                if let Some(pass) = self.backward_pass(problem, &nominal, t0, dt, regularization) {
                    break pass;
                }
                regularization *= self.settings.regularization_factor;
                if regularization > self.settings.max_regularization {
                    return Err(OptimizerError::NumericalFailure(
                        "Q_uu not positive definite at maximum regularization".to_string(),
                    ));
                }
            };

            let threshold = tol * nominal.cost.abs() + f64::EPSILON;
            if pass.expected_reduction <= threshold {
                gains = Some(pass.gains);
                converged = true;
                break;
            }

            let mut alpha = 1.0;
            let mut accepted = None;
            for _ in 0..self.settings.max_line_search_steps.max(1) {
                if let Some(candidate) = Self::forward_pass(problem, &nominal, &pass, alpha, t0, dt)
                    && candidate.cost < nominal.cost
                {
                    accepted = Some(candidate);
                    break;
                }
                alpha *= self.settings.line_search_shrink;
            }

            match accepted {
                Some(candidate) => {
                    let improvement = nominal.cost - candidate.cost;
                    trace!(
                        "iLQR iteration {}: cost {:.6e} -> {:.6e} (alpha {})",
                        iterations, nominal.cost, candidate.cost, alpha
                    );
                    let relative = improvement / nominal.cost.abs().max(f64::MIN_POSITIVE);
                    nominal = candidate;
                    gains = Some(pass.gains);
                    regularization = (regularization / self.settings.regularization_factor)
                        .max(self.settings.initial_regularization);
                    if relative < tol {
                        converged = true;
                        break;
                    }
                },
                None => {
                    gains = Some(pass.gains);
                    regularization *= self.settings.regularization_factor;
                    if regularization > self.settings.max_regularization {
                        break;
                    }
                },
            }
        }

        debug!(
            "iLQR finished: {} iterations, cost {:.6e}, converged {}",
            iterations, nominal.cost, converged
        );
        Self::build_solution(nominal, gains, policy, converged, iterations)
    }
}
