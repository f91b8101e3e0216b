//! # 最优控制问题
//!
//! 动力学 + 二次型代价 + 可选状态边界 + 初始状态 + 时域长度。
//! MPC 控制器每个周期只修改初始状态与时域长度，其余部分只读。

use std::sync::Arc;

use crate::cost::QuadraticCost;
use crate::error::OptimizerError;
use crate::system::ControlledSystem;
use recede_types::{ControlVector, StateVector};

/// 状态盒约束 `lower ≤ x ≤ upper`
#[derive(Debug, Clone, PartialEq)]
pub struct StateBounds {
    pub lower: StateVector,
    pub upper: StateVector,
}

impl StateBounds {
    pub fn new(lower: StateVector, upper: StateVector) -> Result<Self, OptimizerError> {
        if lower.len() != upper.len() {
            return Err(OptimizerError::DimensionMismatch {
                what: "state bounds",
                expected: lower.len(),
                actual: upper.len(),
            });
        }
        if lower.iter().zip(upper.iter()).any(|(lo, hi)| lo > hi) {
            return Err(OptimizerError::InvalidProblem(
                "state lower bound exceeds upper bound".to_string(),
            ));
        }
        Ok(Self { lower, upper })
    }

    pub fn contains(&self, x: &StateVector) -> bool {
        x.len() == self.lower.len()
            && x
                .iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
    }
}

/// 有限时域最优控制问题
#[derive(Debug, Clone)]
pub struct Problem {
    system: Arc<dyn ControlledSystem>,
    cost: QuadraticCost,
    initial_state: StateVector,
    time_horizon: f64,
    nominal_control: ControlVector,
    state_bounds: Option<StateBounds>,
}

impl Problem {
    /// 创建问题
    ///
    /// 名义控制默认为代价函数的参考控制。
    ///
    /// # 错误
    ///
    /// - `DimensionMismatch`: 代价或初始状态维度与系统不一致
    /// - `InvalidProblem`: 时域长度非正
    pub fn new(
        system: Arc<dyn ControlledSystem>,
        cost: QuadraticCost,
        initial_state: StateVector,
        time_horizon: f64,
    ) -> Result<Self, OptimizerError> {
        if cost.state_dim() != system.state_dim() {
            return Err(OptimizerError::DimensionMismatch {
                what: "cost state weight",
                expected: system.state_dim(),
                actual: cost.state_dim(),
            });
        }
        if cost.control_dim() != system.control_dim() {
            return Err(OptimizerError::DimensionMismatch {
                what: "cost control weight",
                expected: system.control_dim(),
                actual: cost.control_dim(),
            });
        }

        let nominal_control = cost.control_reference().clone();
        let mut problem = Self {
            system,
            cost,
            initial_state: StateVector::zeros(0),
            time_horizon: 0.0,
            nominal_control,
            state_bounds: None,
        };
        problem.set_initial_state(initial_state)?;
        problem.set_time_horizon(time_horizon)?;
        Ok(problem)
    }

    /// 添加状态边界
    pub fn with_state_bounds(mut self, bounds: StateBounds) -> Result<Self, OptimizerError> {
        if bounds.lower.len() != self.state_dim() {
            return Err(OptimizerError::DimensionMismatch {
                what: "state bounds",
                expected: self.state_dim(),
                actual: bounds.lower.len(),
            });
        }
        self.state_bounds = Some(bounds);
        Ok(self)
    }

    /// 设置名义控制（热启动尾部外推 `ProblemDefault` 使用）
    pub fn with_nominal_control(mut self, u: ControlVector) -> Result<Self, OptimizerError> {
        if u.len() != self.control_dim() {
            return Err(OptimizerError::DimensionMismatch {
                what: "nominal control",
                expected: self.control_dim(),
                actual: u.len(),
            });
        }
        self.nominal_control = u;
        Ok(self)
    }

    pub fn set_initial_state(&mut self, state: StateVector) -> Result<(), OptimizerError> {
        if state.len() != self.state_dim() {
            return Err(OptimizerError::DimensionMismatch {
                what: "initial state",
                expected: self.state_dim(),
                actual: state.len(),
            });
        }
        self.initial_state = state;
        Ok(())
    }

    pub fn set_time_horizon(&mut self, horizon: f64) -> Result<(), OptimizerError> {
        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(OptimizerError::InvalidProblem(format!(
                "time horizon must be positive, got {}",
                horizon
            )));
        }
        self.time_horizon = horizon;
        Ok(())
    }

    pub fn system(&self) -> &Arc<dyn ControlledSystem> {
        &self.system
    }

    pub fn cost(&self) -> &QuadraticCost {
        &self.cost
    }

    pub fn initial_state(&self) -> &StateVector {
        &self.initial_state
    }

    pub fn time_horizon(&self) -> f64 {
        self.time_horizon
    }

    pub fn nominal_control(&self) -> &ControlVector {
        &self.nominal_control
    }

    pub fn state_bounds(&self) -> Option<&StateBounds> {
        self.state_bounds.as_ref()
    }

    pub fn state_dim(&self) -> usize {
        self.system.state_dim()
    }

    pub fn control_dim(&self) -> usize {
        self.system.control_dim()
    }

    /// 检查初始状态是否满足状态边界
    pub fn check_feasible(&self) -> Result<(), OptimizerError> {
        if self.initial_state.iter().any(|v| !v.is_finite()) {
            return Err(OptimizerError::InvalidProblem(
                "initial state is not finite".to_string(),
            ));
        }
        if let Some(bounds) = &self.state_bounds
            && !bounds.contains(&self.initial_state)
        {
            return Err(OptimizerError::InvalidProblem(
                "initial state outside state bounds".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::QuadraticCostConfig;
    use crate::system::SecondOrderSystem;
    use nalgebra::DVector;

    fn problem() -> Problem {
        let cost = QuadraticCost::from_config(&QuadraticCostConfig {
            q_diag: vec![1.0, 1.0],
            r_diag: vec![1.0],
            q_final_diag: vec![1.0, 1.0],
            x_ref: None,
            u_ref: Some(vec![0.5]),
        })
        .unwrap();
        Problem::new(
            Arc::new(SecondOrderSystem::new(1.0, 0.5)),
            cost,
            DVector::zeros(2),
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_nominal_control_defaults_to_reference() {
        let p = problem();
        assert_eq!(p.nominal_control()[0], 0.5);
        assert_eq!(p.state_dim(), 2);
        assert_eq!(p.control_dim(), 1);
    }

    #[test]
    fn test_setters_validate() {
        let mut p = problem();
        assert!(p.set_initial_state(DVector::zeros(3)).is_err());
        assert!(p.set_time_horizon(0.0).is_err());
        assert!(p.set_time_horizon(f64::NAN).is_err());

        p.set_time_horizon(2.5).unwrap();
        assert_eq!(p.time_horizon(), 2.5);
    }

    #[test]
    fn test_state_bounds_feasibility() {
        let bounds = StateBounds::new(
            DVector::from_vec(vec![-1.0, -1.0]),
            DVector::from_vec(vec![1.0, 1.0]),
        )
        .unwrap();
        let mut p = problem().with_state_bounds(bounds).unwrap();
        assert!(p.check_feasible().is_ok());

        p.set_initial_state(DVector::from_vec(vec![2.0, 0.0])).unwrap();
        assert!(matches!(
            p.check_feasible(),
            Err(OptimizerError::InvalidProblem(_))
        ));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let err = StateBounds::new(DVector::from_vec(vec![1.0]), DVector::from_vec(vec![0.0]));
        assert!(err.is_err());
    }
}
