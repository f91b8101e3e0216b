//! # Recede Types - 共享数据结构
//!
//! **依赖原则**: 只依赖 `nalgebra` 和 `serde`，不依赖求解器或控制器
//!
//! ## 包含模块
//!
//! - `policy` - 状态反馈策略（前馈 + 反馈增益，固定步长）
//! - `trajectory` - 状态轨迹（带时间偏移的状态采样）
//! - `statistics` - MPC 周期记录与汇总统计
//! - `clock` - 单调时钟抽象（真实时钟 / 手动时钟）
//! - `error` - 数据结构校验错误
//!
//! ## 使用示例
//!
//! ```rust
//! use recede_types::{Policy, Trajectory};
//! use nalgebra::DVector;
//!
//! // 2 维状态、1 维控制、10 步、dt = 0.01
//! let policy = Policy::zeros(10, 2, 1, 0.01, 0.0);
//! assert_eq!(policy.len(), 10);
//!
//! let traj = Trajectory::constant(DVector::zeros(2), 11, 0.01, 0.0).unwrap();
//! assert_eq!(traj.len(), 11);
//! ```

pub mod clock;
pub mod error;
pub mod policy;
pub mod statistics;
pub mod trajectory;

use nalgebra::{DMatrix, DVector};

/// 状态向量
pub type StateVector = DVector<f64>;

/// 控制向量
pub type ControlVector = DVector<f64>;

/// 反馈增益矩阵（`control_dim × state_dim`）
pub type FeedbackMatrix = DMatrix<f64>;

// 重新导出常用类型
pub use clock::{Clock, Deadline, ManualClock, SystemClock};
pub use error::PolicyError;
pub use policy::Policy;
pub use statistics::{CycleOutcome, CycleRecord, MpcSummary};
pub use trajectory::Trajectory;

/// 时间网格比较容差（秒）
///
/// 浮点时间换算为步数时使用，避免 `2.999 / 0.001` 这类舍入误差。
pub const TIME_EPSILON: f64 = 1e-9;

/// 将时间长度换算为步数（四舍五入到最近的整数步）
///
/// 负数或非有限值返回 0。
pub fn steps_for_duration(duration: f64, dt: f64) -> usize {
    if !duration.is_finite() || !dt.is_finite() || dt <= 0.0 || duration <= TIME_EPSILON {
        return 0;
    }
    (duration / dt).round() as usize
}
