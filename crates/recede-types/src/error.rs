//! 数据结构校验错误

use thiserror::Error;

/// Policy / Trajectory 构造错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// 步长必须为有限正数
    #[error("Invalid timestep: {0} (must be finite and > 0)")]
    InvalidTimestep(f64),

    /// 前馈与反馈序列长度不一致
    #[error("Length mismatch: {feedforward} feed-forward steps vs {feedback} feedback gains")]
    LengthMismatch { feedforward: usize, feedback: usize },

    /// 序列内元素维度不一致
    #[error("Dimension mismatch at step {index}: expected {expected}, got {actual}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// 轨迹至少需要一个采样点
    #[error("Trajectory must contain at least one state sample")]
    EmptyTrajectory,
}
