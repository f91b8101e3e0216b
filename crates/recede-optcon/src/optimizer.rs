//! # 轨迹优化器接口
//!
//! MPC 控制器只通过 [`TrajectoryOptimizer`] 访问求解后端。后端接收问题、
//! 初始猜测与预算，返回改进后的策略和预测轨迹，或报告失败。
//!
//! 未收敛（`converged == false`）不是错误：控制器据此把本周期记为失败，
//! 继续执行上一策略。

use recede_types::{Deadline, Policy, Trajectory};

use crate::error::OptimizerError;
use crate::problem::Problem;

/// 初始猜测
#[derive(Debug, Clone, PartialEq)]
pub struct WarmStart {
    /// 初始策略（步长决定求解网格）
    pub policy: Policy,

    /// 与策略对应的状态轨迹（可选，仅供参考）
    pub trajectory: Option<Trajectory>,
}

impl WarmStart {
    pub fn new(policy: Policy, trajectory: Option<Trajectory>) -> Self {
        Self { policy, trajectory }
    }

    /// 仅含策略的猜测
    pub fn from_policy(policy: Policy) -> Self {
        Self {
            policy,
            trajectory: None,
        }
    }
}

/// 求解预算
#[derive(Debug, Clone, Default)]
pub struct SolveBudget {
    /// 最大迭代次数
    pub max_iterations: usize,

    /// 硬截止时间（可选）
    pub deadline: Option<Deadline>,
}

impl SolveBudget {
    pub fn iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// 截止时间是否已过
    pub fn expired(&self) -> bool {
        self.deadline.as_ref().is_some_and(Deadline::is_expired)
    }
}

/// 求解结果
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub policy: Policy,
    pub trajectory: Trajectory,
    pub converged: bool,
    pub iterations: usize,
    pub cost: f64,
}

/// 轨迹优化后端
pub trait TrajectoryOptimizer: Send {
    /// 后端名称（日志用）
    fn name(&self) -> &str;

    /// 从初始猜测出发求解问题
    ///
    /// 求解网格由 `guess.policy` 的步长与长度决定，`t0` 原样保留。
    fn solve(
        &mut self,
        problem: &Problem,
        guess: &WarmStart,
        budget: &SolveBudget,
    ) -> Result<Solution, OptimizerError>;
}

impl<T: TrajectoryOptimizer + ?Sized> TrajectoryOptimizer for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(
        &mut self,
        problem: &Problem,
        guess: &WarmStart,
        budget: &SolveBudget,
    ) -> Result<Solution, OptimizerError> {
        (**self).solve(problem, guess, budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recede_types::{Clock, ManualClock};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_budget_expiry() {
        let budget = SolveBudget::iterations(5);
        assert!(!budget.expired());

        let clock = Arc::new(ManualClock::new());
        let budget = budget.with_deadline(Deadline::after(clock.clone(), Duration::from_millis(1)));
        assert!(!budget.expired());
        clock.advance(Duration::from_millis(2));
        assert!(budget.expired());
        assert!(clock.now() >= Duration::from_millis(2));
    }

    #[test]
    fn test_warm_start_from_policy() {
        let ws = WarmStart::from_policy(Policy::zeros(3, 2, 1, 0.1, 0.0));
        assert_eq!(ws.policy.len(), 3);
        assert!(ws.trajectory.is_none());
    }
}
