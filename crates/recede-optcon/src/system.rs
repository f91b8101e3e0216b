//! # 受控系统
//!
//! 连续时间动力学 `ẋ = f(x, u, t)`。优化器和状态前向积分只通过此 trait 访问动力学。

use std::fmt::Debug;

use recede_types::{ControlVector, StateVector};
use serde::{Deserialize, Serialize};

/// 受控连续时间系统
pub trait ControlledSystem: Send + Sync + Debug {
    /// 状态维度
    fn state_dim(&self) -> usize;

    /// 控制维度
    fn control_dim(&self) -> usize;

    /// 状态导数 `f(x, u, t)`
    fn derivative(&self, state: &StateVector, control: &ControlVector, t: f64) -> StateVector;
}

/// 阻尼二阶振子
///
/// ```text
/// ẋ₀ = x₁
/// ẋ₁ = g_dc·u − 2ζω_n·x₁ − ω_n²·x₀
/// ```
///
/// 状态 2 维（位置、速度），控制 1 维。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondOrderSystem {
    /// 固有频率 ω_n（rad/s）
    pub w_n: f64,

    /// 阻尼比 ζ
    pub zeta: f64,

    /// 直流增益，默认 ω_n²（单位静态增益）
    pub g_dc: f64,
}

impl SecondOrderSystem {
    pub const STATE_DIM: usize = 2;
    pub const CONTROL_DIM: usize = 1;

    /// 单位静态增益的振子
    pub fn new(w_n: f64, zeta: f64) -> Self {
        Self {
            w_n,
            zeta,
            g_dc: w_n * w_n,
        }
    }

    pub fn with_gain(mut self, g_dc: f64) -> Self {
        self.g_dc = g_dc;
        self
    }
}

impl ControlledSystem for SecondOrderSystem {
    fn state_dim(&self) -> usize {
        Self::STATE_DIM
    }

    fn control_dim(&self) -> usize {
        Self::CONTROL_DIM
    }

    fn derivative(&self, state: &StateVector, control: &ControlVector, _t: f64) -> StateVector {
        let mut dx = StateVector::zeros(Self::STATE_DIM);
        dx[0] = state[1];
        dx[1] = self.g_dc * control[0]
            - 2.0 * self.zeta * self.w_n * state[1]
            - self.w_n * self.w_n * state[0];
        dx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_second_order_derivative() {
        let sys = SecondOrderSystem::new(2.0, 0.5);
        assert_relative_eq!(sys.g_dc, 4.0);

        let x = StateVector::from_vec(vec![1.0, 0.5]);
        let u = ControlVector::from_vec(vec![0.25]);
        let dx = sys.derivative(&x, &u, 0.0);

        assert_relative_eq!(dx[0], 0.5);
        // 4*0.25 - 2*0.5*2*0.5 - 4*1 = 1 - 1 - 4
        assert_relative_eq!(dx[1], -4.0);
    }

    #[test]
    fn test_equilibrium_under_unit_gain() {
        // 单位静态增益：u = x₀ 时位置保持
        let sys = SecondOrderSystem::new(0.1, 5.0);
        let x = StateVector::from_vec(vec![0.7, 0.0]);
        let u = ControlVector::from_vec(vec![0.7]);
        let dx = sys.derivative(&x, &u, 0.0);
        assert_relative_eq!(dx.norm(), 0.0, epsilon = 1e-12);
    }
}
