//! # 二次型代价
//!
//! ```text
//! 过程代价: l(x, u) = ½(x − x_ref)ᵀQ(x − x_ref) + ½(u − u_ref)ᵀR(u − u_ref)
//! 终端代价: φ(x)    = ½(x − x_ref)ᵀQ_f(x − x_ref)
//! ```
//!
//! 离散化时过程代价乘以 `dt`。权重可从 TOML 配置加载（对角形式）。

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::OptimizerError;
use recede_types::{ControlVector, StateVector};

/// 二次型代价配置（对角权重）
///
/// ```toml
/// [cost]
/// q_diag = [10.0, 1.0]
/// r_diag = [1.0]
/// q_final_diag = [100.0, 10.0]
/// x_ref = [1.0, 0.0]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadraticCostConfig {
    /// 过程状态权重对角线
    pub q_diag: Vec<f64>,

    /// 控制权重对角线
    pub r_diag: Vec<f64>,

    /// 终端状态权重对角线
    pub q_final_diag: Vec<f64>,

    /// 参考状态（缺省为零）
    #[serde(default)]
    pub x_ref: Option<Vec<f64>>,

    /// 参考控制（缺省为零）
    #[serde(default)]
    pub u_ref: Option<Vec<f64>>,
}

/// 二次型代价函数
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticCost {
    q: DMatrix<f64>,
    r: DMatrix<f64>,
    q_final: DMatrix<f64>,
    x_ref: StateVector,
    u_ref: ControlVector,
}

impl QuadraticCost {
    /// 从完整矩阵创建，参考值为零
    ///
    /// # 错误
    ///
    /// 矩阵非方阵或维度与 Q / R 不一致时返回 `DimensionMismatch`；
    /// R 必须正定（Cholesky 可分解），否则返回 `InvalidProblem`。
    pub fn new(
        q: DMatrix<f64>,
        r: DMatrix<f64>,
        q_final: DMatrix<f64>,
    ) -> Result<Self, OptimizerError> {
        let n = q.nrows();
        let m = r.nrows();
        check_square("Q", &q, n)?;
        check_square("R", &r, m)?;
        check_square("Q_final", &q_final, n)?;
        if r.clone().cholesky().is_none() {
            return Err(OptimizerError::InvalidProblem(
                "control weight R must be positive definite".to_string(),
            ));
        }
        Ok(Self {
            q,
            r,
            q_final,
            x_ref: StateVector::zeros(n),
            u_ref: ControlVector::zeros(m),
        })
    }

    /// 从对角配置创建
    pub fn from_config(config: &QuadraticCostConfig) -> Result<Self, OptimizerError> {
        let q = DMatrix::from_diagonal(&DVector::from_column_slice(&config.q_diag));
        let r = DMatrix::from_diagonal(&DVector::from_column_slice(&config.r_diag));
        let q_final = DMatrix::from_diagonal(&DVector::from_column_slice(&config.q_final_diag));
        let mut cost = Self::new(q, r, q_final)?;
        if let Some(x_ref) = &config.x_ref {
            cost = cost.with_state_reference(DVector::from_column_slice(x_ref))?;
        }
        if let Some(u_ref) = &config.u_ref {
            cost = cost.with_control_reference(DVector::from_column_slice(u_ref))?;
        }
        Ok(cost)
    }

    /// 设置参考状态
    pub fn with_state_reference(mut self, x_ref: StateVector) -> Result<Self, OptimizerError> {
        if x_ref.len() != self.state_dim() {
            return Err(OptimizerError::DimensionMismatch {
                what: "state reference",
                expected: self.state_dim(),
                actual: x_ref.len(),
            });
        }
        self.x_ref = x_ref;
        Ok(self)
    }

    /// 设置参考控制
    pub fn with_control_reference(mut self, u_ref: ControlVector) -> Result<Self, OptimizerError> {
        if u_ref.len() != self.control_dim() {
            return Err(OptimizerError::DimensionMismatch {
                what: "control reference",
                expected: self.control_dim(),
                actual: u_ref.len(),
            });
        }
        self.u_ref = u_ref;
        Ok(self)
    }

    pub fn state_dim(&self) -> usize {
        self.q.nrows()
    }

    pub fn control_dim(&self) -> usize {
        self.r.nrows()
    }

    pub fn q(&self) -> &DMatrix<f64> {
        &self.q
    }

    pub fn r(&self) -> &DMatrix<f64> {
        &self.r
    }

    pub fn q_final(&self) -> &DMatrix<f64> {
        &self.q_final
    }

    pub fn state_reference(&self) -> &StateVector {
        &self.x_ref
    }

    pub fn control_reference(&self) -> &ControlVector {
        &self.u_ref
    }

    /// 过程代价（未乘 dt）
    pub fn stage(&self, x: &StateVector, u: &ControlVector) -> f64 {
        let dx = x - &self.x_ref;
        let du = u - &self.u_ref;
        0.5 * (dx.dot(&(&self.q * &dx)) + du.dot(&(&self.r * &du)))
    }

    /// 终端代价
    pub fn terminal(&self, x: &StateVector) -> f64 {
        let dx = x - &self.x_ref;
        0.5 * dx.dot(&(&self.q_final * &dx))
    }

    /// 过程代价对 x 的梯度
    pub fn stage_grad_x(&self, x: &StateVector) -> StateVector {
        &self.q * (x - &self.x_ref)
    }

    /// 过程代价对 u 的梯度
    pub fn stage_grad_u(&self, u: &ControlVector) -> ControlVector {
        &self.r * (u - &self.u_ref)
    }

    /// 终端代价梯度
    pub fn terminal_grad(&self, x: &StateVector) -> StateVector {
        &self.q_final * (x - &self.x_ref)
    }
}

fn check_square(what: &'static str, m: &DMatrix<f64>, dim: usize) -> Result<(), OptimizerError> {
    if m.nrows() != dim || m.ncols() != dim {
        return Err(OptimizerError::DimensionMismatch {
            what,
            expected: dim,
            actual: if m.nrows() != dim { m.nrows() } else { m.ncols() },
        });
    }
    Ok(())
}
