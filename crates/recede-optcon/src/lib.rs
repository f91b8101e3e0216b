//! # Recede Optcon - 最优控制问题与轨迹优化
//!
//! MPC 控制器的外部协作者：问题描述、动力学、代价与求解后端。
//! 控制器只依赖 [`TrajectoryOptimizer`] trait 与 [`Problem`]，
//! 不依赖任何具体后端。
//!
//! ## 模块
//!
//! - `system` - 受控系统 trait 与阻尼二阶振子
//! - `cost` - 二次型代价（可从配置加载）
//! - `problem` - 有限时域问题（初始状态、时域、名义控制、状态边界）
//! - `integrator` - RK4 积分（零阶保持）与策略展开
//! - `linearize` - 离散动力学有限差分线性化
//! - `optimizer` - 求解器接口（初始猜测、预算、结果）
//! - `ilqr` - 迭代 LQR 参考后端
//!
//! ## 示例
//!
//! ```rust
//! use std::sync::Arc;
//! use nalgebra::DVector;
//! use recede_optcon::{
//!     IlqrSolver, Problem, QuadraticCost, QuadraticCostConfig, SecondOrderSystem,
//!     SolveBudget, TrajectoryOptimizer, WarmStart,
//! };
//! use recede_types::Policy;
//!
//! let cost = QuadraticCost::from_config(&QuadraticCostConfig {
//!     q_diag: vec![1.0, 0.1],
//!     r_diag: vec![0.1],
//!     q_final_diag: vec![10.0, 1.0],
//!     x_ref: Some(vec![1.0, 0.0]),
//!     u_ref: None,
//! })
//! .unwrap();
//! let problem = Problem::new(
//!     Arc::new(SecondOrderSystem::new(2.0, 0.5)),
//!     cost,
//!     DVector::zeros(2),
//!     0.2,
//! )
//! .unwrap();
//!
//! let guess = WarmStart::from_policy(Policy::zeros(20, 2, 1, 0.01, 0.0));
//! let solution = IlqrSolver::default()
//!     .solve(&problem, &guess, &SolveBudget::iterations(5))
//!     .unwrap();
//! assert_eq!(solution.policy.len(), 20);
//! ```

pub mod cost;
pub mod error;
pub mod ilqr;
pub mod integrator;
pub mod linearize;
pub mod optimizer;
pub mod problem;
pub mod system;

pub use cost::{QuadraticCost, QuadraticCostConfig};
pub use error::OptimizerError;
pub use ilqr::{IlqrSettings, IlqrSolver};
pub use integrator::{rk4_step, rollout, simulate_policy};
pub use linearize::linearize_discrete;
pub use optimizer::{SolveBudget, Solution, TrajectoryOptimizer, WarmStart};
pub use problem::{Problem, StateBounds};
pub use system::{ControlledSystem, SecondOrderSystem};
