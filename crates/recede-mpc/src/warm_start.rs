//! # 热启动变换
//!
//! 把上一周期的策略与轨迹"老化" `elapsed` 秒，作为本周期优化器的初始猜测：
//!
//! 1. 丢弃前 `round(elapsed / dt)` 步
//! 2. 截断或按尾部外推规则延长到 `steps` 步
//! 3. 用前向积分得到的状态替换轨迹第 0 个采样
//!
//! 步长保持不变；步长不一致的策略直接拒绝，不做重采样。
//! `elapsed = 0` 且 `steps = K` 时策略原样返回。

use recede_optcon::{Problem, WarmStart};
use recede_types::{FeedbackMatrix, Policy, StateVector, TIME_EPSILON, Trajectory, steps_for_duration};
use tracing::trace;

use crate::error::{MpcError, Result};
use crate::settings::TailExtension;

/// 热启动变换器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarmStartTransformer {
    dt: f64,
    tail: TailExtension,
}

impl WarmStartTransformer {
    pub fn new(dt: f64, tail: TailExtension) -> Self {
        Self { dt, tail }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn tail_extension(&self) -> TailExtension {
        self.tail
    }

    /// 冷启动猜测：零前馈、零反馈，轨迹为常值
    ///
    /// `t0` 为 0，由调用方设置。
    pub fn default_guess(
        &self,
        problem: &Problem,
        projected_state: &StateVector,
        steps: usize,
    ) -> Result<WarmStart> {
        let policy = Policy::zeros(
            steps,
            problem.state_dim(),
            problem.control_dim(),
            self.dt,
            0.0,
        );
        let trajectory = Trajectory::constant(projected_state.clone(), steps + 1, self.dt, 0.0)
            .map_err(|e| MpcError::Configuration(e.to_string()))?;
        Ok(WarmStart::new(policy, Some(trajectory)))
    }

    /// 生成本周期的初始猜测
    ///
    /// 没有上一策略（或上一策略为空）时退化为 [`default_guess`](Self::default_guess)。
    /// 平移后的 `t0` 为 `previous.t0 + shift·dt`。
    pub fn transform(
        &self,
        problem: &Problem,
        previous_policy: Option<&Policy>,
        previous_trajectory: Option<&Trajectory>,
        projected_state: &StateVector,
        elapsed: f64,
        steps: usize,
    ) -> Result<WarmStart> {
        let Some(previous) = previous_policy.filter(|p| !p.is_empty()) else {
            return self.default_guess(problem, projected_state, steps);
        };
        self.check_dt("policy", previous.dt())?;

        let shift = steps_for_duration(elapsed, self.dt);
        let mut policy = previous.clone();
        // 超出上一策略范围时至少保留最后一步，用于尾部外推
        let dropped = policy.truncate_front(shift.min(policy.len() - 1));

        if policy.len() > steps {
            policy.truncate_back(steps);
        } else if policy.len() < steps {
            let missing = steps - policy.len();
            match self.tail {
                TailExtension::HoldLast => {
                    policy.extend_hold_last(missing);
                },
                TailExtension::ProblemDefault => {
                    let gain = FeedbackMatrix::zeros(problem.control_dim(), problem.state_dim());
                    policy.extend_with(missing, problem.nominal_control(), &gain);
                },
            }
        }

        let trajectory = match previous_trajectory {
            Some(previous) => {
                self.check_dt("trajectory", previous.dt())?;
                let mut trajectory = previous.clone();
                trajectory.truncate_front(dropped);
                trajectory.resize_hold_last(steps + 1);
                trajectory.set_initial_state(projected_state.clone());
                trajectory
            },
            None => Trajectory::constant(projected_state.clone(), steps + 1, self.dt, policy.t0())
                .map_err(|e| MpcError::Configuration(e.to_string()))?,
        };

        trace!(
            "Warm start: shifted {} steps, {} -> {} steps ({:?})",
            shift,
            previous.len(),
            policy.len(),
            self.tail
        );
        Ok(WarmStart::new(policy, Some(trajectory)))
    }

    fn check_dt(&self, what: &str, dt: f64) -> Result<()> {
        if (dt - self.dt).abs() > TIME_EPSILON {
            return Err(MpcError::Configuration(format!(
                "previous {} dt {} differs from configured dt {}",
                what, dt, self.dt
            )));
        }
        Ok(())
    }
}
