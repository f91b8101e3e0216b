//! 集成测试共用工具

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use recede_sdk::prelude::*;

/// 直接接受初始猜测的优化器
///
/// 每次调用把共享的 `ManualClock` 推进 `solve_time`，模拟求解耗时。
#[derive(Debug)]
pub struct StubOptimizer {
    clock: Arc<ManualClock>,
    solve_time: Duration,
    free_first_call: bool,
    pub calls: usize,
    /// 返回未收敛的调用序号
    pub fail_on: Vec<usize>,
}

impl StubOptimizer {
    pub fn new(clock: Arc<ManualClock>, solve_time: Duration) -> Self {
        Self {
            clock,
            solve_time,
            free_first_call: false,
            calls: 0,
            fail_on: Vec::new(),
        }
    }

    /// 第一次调用不消耗时间（冷启动时不触发后截断）
    pub fn free_first_call(mut self) -> Self {
        self.free_first_call = true;
        self
    }

    pub fn failing_on(mut self, calls: Vec<usize>) -> Self {
        self.fail_on = calls;
        self
    }
}

impl TrajectoryOptimizer for StubOptimizer {
    fn name(&self) -> &str {
        "stub"
    }

    fn solve(
        &mut self,
        problem: &Problem,
        guess: &WarmStart,
        _budget: &SolveBudget,
    ) -> Result<Solution, OptimizerError> {
        let call = self.calls;
        self.calls += 1;
        if !(self.free_first_call && call == 0) {
            self.clock.advance(self.solve_time);
        }
        problem.check_feasible()?;

        let trajectory = match &guess.trajectory {
            Some(traj) => traj.clone(),
            None => Trajectory::constant(
                problem.initial_state().clone(),
                guess.policy.len() + 1,
                guess.policy.dt(),
                guess.policy.t0(),
            )?,
        };
        Ok(Solution {
            policy: guess.policy.clone(),
            trajectory,
            converged: !self.fail_on.contains(&call),
            iterations: 1,
            cost: 0.0,
        })
    }
}

/// 阻尼二阶振子，目标位置 1.0
pub fn oscillator_problem(horizon: f64) -> Problem {
    let cost = QuadraticCost::from_config(&QuadraticCostConfig {
        q_diag: vec![10.0, 1.0],
        r_diag: vec![0.1],
        q_final_diag: vec![100.0, 10.0],
        x_ref: Some(vec![1.0, 0.0]),
        u_ref: None,
    })
    .expect("valid cost");
    Problem::new(
        Arc::new(SecondOrderSystem::new(10.0, 0.1)),
        cost,
        StateVector::zeros(2),
        horizon,
    )
    .expect("valid problem")
}

/// 使用手动时钟与桩优化器的控制器
pub fn stub_controller(
    settings: MpcSettings,
    horizon: f64,
    solve_time: Duration,
) -> (MpcController, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let optimizer = StubOptimizer::new(clock.clone(), solve_time).free_first_call();
    let mpc = MpcController::with_clock(
        settings,
        oscillator_problem(horizon),
        Box::new(optimizer),
        clock.clone(),
    )
    .expect("valid controller");
    (mpc, clock)
}
