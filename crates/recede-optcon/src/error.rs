//! 优化层错误类型定义

use recede_types::PolicyError;
use thiserror::Error;

/// 轨迹优化器错误
///
/// 这些错误对 MPC 控制循环来说是**可恢复**的：控制器记录失败并继续执行上一策略。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    /// 维度不匹配（状态 / 控制 / 增益）
    #[error("Dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// 问题无效（如初始状态超出可行域、时域非法）
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// 超过截止时间，已完成的迭代被丢弃
    #[error("Deadline exceeded after {iterations} iterations")]
    DeadlineExceeded { iterations: usize },

    /// 数值失败（正则化耗尽、代价发散）
    #[error("Numerical failure: {0}")]
    NumericalFailure(String),

    /// 构造策略 / 轨迹失败
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_error_display() {
        let err = OptimizerError::DimensionMismatch {
            what: "initial state",
            expected: 2,
            actual: 3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("initial state") && msg.contains('2') && msg.contains('3'));

        let msg = format!("{}", OptimizerError::InvalidProblem("x0 out of bounds".into()));
        assert!(msg.contains("Invalid problem") && msg.contains("x0 out of bounds"));

        let msg = format!("{}", OptimizerError::DeadlineExceeded { iterations: 2 });
        assert_eq!(msg, "Deadline exceeded after 2 iterations");
    }

    #[test]
    fn test_from_policy_error() {
        let err: OptimizerError = PolicyError::EmptyTrajectory.into();
        assert!(matches!(err, OptimizerError::Policy(PolicyError::EmptyTrajectory)));
    }
}
