//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use recede_sdk::prelude::*;
//! ```

// 控制层
pub use recede_mpc::{
    HorizonMode, MpcController, MpcOutput, MpcPhase, MpcSettings, TailExtension,
};

// 优化层
pub use recede_optcon::{
    ControlledSystem, IlqrSettings, IlqrSolver, Problem, QuadraticCost, QuadraticCostConfig,
    SecondOrderSystem, SolveBudget, Solution, StateBounds, TrajectoryOptimizer, WarmStart,
};

// 数据层
pub use recede_types::{
    Clock, ControlVector, CycleOutcome, CycleRecord, FeedbackMatrix, ManualClock, MpcSummary,
    Policy, StateVector, SystemClock, Trajectory,
};

// 错误类型
pub use recede_mpc::MpcError;
pub use recede_optcon::OptimizerError;
pub use recede_types::PolicyError;
