//! Recede SDK - 滚动时域模型预测控制
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **数据层** (`types`): 策略、轨迹、周期统计、时钟
//! - **优化层** (`optcon`): 问题描述、动力学、代价、求解器接口与 iLQR 后端
//! - **控制层** (`mpc`): 控制循环、热启动、时域策略、延迟补偿
//!
//! # 快速开始
//!
//! ```rust
//! use recede_sdk::prelude::*;
//! use std::sync::Arc;
//!
//! let cost = QuadraticCost::from_config(&QuadraticCostConfig {
//!     q_diag: vec![10.0, 1.0],
//!     r_diag: vec![0.1],
//!     q_final_diag: vec![100.0, 10.0],
//!     x_ref: Some(vec![1.0, 0.0]),
//!     u_ref: None,
//! })?;
//! let problem = Problem::new(
//!     Arc::new(SecondOrderSystem::new(2.0, 0.5)),
//!     cost,
//!     StateVector::zeros(2),
//!     0.2,
//! )?;
//! let settings = MpcSettings { dt: 0.01, ..Default::default() };
//!
//! let mut mpc = MpcController::new(settings, problem, Box::new(IlqrSolver::default()))?;
//! let output = mpc.run(&StateVector::zeros(2), 0.0)?;
//! assert!(output.policy_timestamp >= 0.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod logging;
pub mod prelude;

/// 数据层
pub mod types {
    pub use recede_types::*;
}

/// 优化层
pub mod optcon {
    pub use recede_optcon::*;
}

/// 控制层
pub mod mpc {
    pub use recede_mpc::*;
}

// --- 常用类型 ---

pub use logging::init_logging;
pub use recede_mpc::{MpcController, MpcError, MpcOutput, MpcSettings};
pub use recede_optcon::{OptimizerError, Problem, TrajectoryOptimizer};
pub use recede_types::{MpcSummary, Policy, Trajectory};
