//! # RK4 积分
//!
//! 控制量在每个积分步内零阶保持。优化器的离散动力学与 MPC 状态前向积分共用
//! [`rk4_step`]，保证预测与求解使用同一离散模型。

use recede_types::{ControlVector, Policy, StateVector, TIME_EPSILON, Trajectory};

use crate::error::OptimizerError;
use crate::system::ControlledSystem;

/// 单步 RK4（控制量零阶保持）
pub fn rk4_step(
    system: &dyn ControlledSystem,
    state: &StateVector,
    control: &ControlVector,
    t: f64,
    h: f64,
) -> StateVector {
    let k1 = system.derivative(state, control, t);
    let k2 = system.derivative(&(state + &k1 * (0.5 * h)), control, t + 0.5 * h);
    let k3 = system.derivative(&(state + &k2 * (0.5 * h)), control, t + 0.5 * h);
    let k4 = system.derivative(&(state + &k3 * h), control, t + h);
    state + (k1 + (k2 + k3) * 2.0 + k4) * (h / 6.0)
}

/// 在策略作用下从 `t_start` 积分 `duration` 秒
///
/// 积分步长为 `policy.dt() / substeps`，最后一步截短到恰好结束。
/// 每个子步开始时按当前状态重新计算反馈控制量。空策略或非正时长直接返回初始状态。
pub fn simulate_policy(
    system: &dyn ControlledSystem,
    policy: &Policy,
    state: &StateVector,
    t_start: f64,
    duration: f64,
    substeps: usize,
) -> StateVector {
    let mut x = state.clone();
    if policy.is_empty() || !duration.is_finite() || duration <= TIME_EPSILON {
        return x;
    }

    let h_nominal = policy.dt() / substeps.max(1) as f64;
    let end = t_start + duration;
    let mut t = t_start;

    while t < end - TIME_EPSILON {
        let h = h_nominal.min(end - t);
        let Some(u) = policy.control(t, &x) else {
            break;
        };
        x = rk4_step(system, &x, &u, t, h);
        t += h;
    }
    x
}

/// 闭环展开策略，得到策略网格上的 K+1 个状态采样
///
/// 第 k 步控制量为 `u_ff[k] + K[k]·x_k`，在整个 `dt` 内保持。
pub fn rollout(
    system: &dyn ControlledSystem,
    policy: &Policy,
    initial_state: &StateVector,
) -> Result<Trajectory, OptimizerError> {
    let dt = policy.dt();
    let mut states = Vec::with_capacity(policy.len() + 1);
    states.push(initial_state.clone());

    let mut x = initial_state.clone();
    for k in 0..policy.len() {
        let t = policy.t0() + k as f64 * dt;
        let mut u = policy.feedforward()[k].clone();
        if let Some(gains) = policy.feedback() {
            u += &gains[k] * &x;
        }
        x = rk4_step(system, &x, &u, t, dt);
        if x.iter().any(|v| !v.is_finite()) {
            return Err(OptimizerError::NumericalFailure(format!(
                "rollout diverged at step {}",
                k
            )));
        }
        states.push(x.clone());
    }

    Ok(Trajectory::new(policy.t0(), dt, states)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::SecondOrderSystem;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    /// ẋ = u（单积分器）
    #[derive(Debug)]
    struct Integrator1;

    impl ControlledSystem for Integrator1 {
        fn state_dim(&self) -> usize {
            1
        }
        fn control_dim(&self) -> usize {
            1
        }
        fn derivative(&self, _x: &StateVector, u: &ControlVector, _t: f64) -> StateVector {
            u.clone()
        }
    }

    #[test]
    fn test_rk4_exact_for_constant_input() {
        let x = DVector::from_element(1, 1.0);
        let u = DVector::from_element(1, 2.0);
        let next = rk4_step(&Integrator1, &x, &u, 0.0, 0.5);
        assert_relative_eq!(next[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rk4_matches_exponential_decay() {
        // 振子在零输入、强阻尼下衰减；与小步长积分对比
        let sys = SecondOrderSystem::new(1.0, 0.7);
        let x0 = DVector::from_vec(vec![1.0, 0.0]);
        let u = DVector::zeros(1);

        let coarse = rk4_step(&sys, &x0, &u, 0.0, 0.01);
        let mut fine = x0.clone();
        for i in 0..10 {
            fine = rk4_step(&sys, &fine, &u, i as f64 * 0.001, 0.001);
        }
        assert_relative_eq!(coarse, fine, epsilon = 1e-8);
    }

    #[test]
    fn test_simulate_policy_partial_step() {
        let ff = vec![DVector::from_element(1, 1.0); 10];
        let policy = Policy::new(0.0, 0.1, ff, None).unwrap();
        let x0 = DVector::from_element(1, 0.0);

        let x = simulate_policy(&Integrator1, &policy, &x0, 0.0, 0.25, 2);
        assert_relative_eq!(x[0], 0.25, epsilon = 1e-12);

        // 非正时长不积分
        let x = simulate_policy(&Integrator1, &policy, &x0, 0.0, 0.0, 2);
        assert_relative_eq!(x[0], 0.0);
    }

    #[test]
    fn test_simulate_policy_uses_feedback() {
        // u = -x：ẋ = -x，积分 1 秒后 x ≈ e^-1（零阶保持带来 O(h) 误差）
        let ff = vec![DVector::zeros(1); 100];
        let fb = vec![DMatrix::from_element(1, 1, -1.0); 100];
        let policy = Policy::new(0.0, 0.01, ff, Some(fb)).unwrap();
        let x0 = DVector::from_element(1, 1.0);

        let x = simulate_policy(&Integrator1, &policy, &x0, 0.0, 1.0, 4);
        assert_relative_eq!(x[0], (-1.0_f64).exp(), epsilon = 2e-3);
    }

    #[test]
    fn test_rollout_sample_count() {
        let policy = Policy::zeros(20, 2, 1, 0.05, 1.0);
        let sys = SecondOrderSystem::new(1.0, 0.1);
        let traj = rollout(&sys, &policy, &DVector::from_vec(vec![1.0, 0.0])).unwrap();
        assert_eq!(traj.len(), 21);
        assert_relative_eq!(traj.t0(), 1.0);
        assert_relative_eq!(traj.end_time(), 2.0, epsilon = 1e-12);
    }

    proptest::proptest! {
        #[test]
        fn prop_constant_input_integrates_exactly(
            u in -10.0f64..10.0,
            duration in 0.0f64..0.5,
            substeps in 1usize..8,
        ) {
            let ff = vec![DVector::from_element(1, u); 50];
            let policy = Policy::new(0.0, 0.01, ff, None).unwrap();
            let x = simulate_policy(&Integrator1, &policy, &DVector::zeros(1), 0.0, duration, substeps);
            let expected = if duration <= TIME_EPSILON { 0.0 } else { u * duration };
            proptest::prop_assert!((x[0] - expected).abs() < 1e-7);
        }
    }
}
