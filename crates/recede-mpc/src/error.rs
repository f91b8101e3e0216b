//! MPC 层错误类型定义

use thiserror::Error;

/// MPC 控制器错误
///
/// 优化器失败**不是** `run()` 的错误：它以 `success = false` 返回，
/// 并在周期记录中留下 `CycleOutcome`。这里只包含调用方违约和配置问题。
#[derive(Error, Debug)]
pub enum MpcError {
    /// 时间倒退（本次调用时间早于上次）
    #[error("Time ordering violation: current time {current} is earlier than previous {previous}")]
    OrderingViolation { previous: f64, current: f64 },

    /// 测量状态维度与问题不一致
    #[error("State dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// 配置错误（时域、步长、热启动策略等）
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 已到达时域终点，需要 `reset()` 后才能继续
    #[error("Controller is terminated (time horizon reached)")]
    TerminalState,

    /// 配置文件读取失败
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件解析失败
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, MpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mpc_error_display() {
        let msg = format!(
            "{}",
            MpcError::OrderingViolation {
                previous: 1.5,
                current: 1.0
            }
        );
        assert!(msg.contains("1.5") && msg.contains("earlier"));

        let msg = format!(
            "{}",
            MpcError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
        assert_eq!(msg, "State dimension mismatch: expected 2, got 3");

        let msg = format!("{}", MpcError::TerminalState);
        assert!(msg.contains("terminated"));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.toml");
        let err: MpcError = io.into();
        assert!(matches!(err, MpcError::Io(_)));
        assert!(format!("{}", err).contains("missing.toml"));
    }
}
