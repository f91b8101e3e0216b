//! 日志初始化
//!
//! 库 crate 只使用 `tracing` 宏，不安装订阅者。应用在启动时调用一次 [`init_logging`]。

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// 安装 `fmt` 订阅者
///
/// 过滤规则优先取 `RUST_LOG`，未设置时使用 `default_directives`（如 `"recede_mpc=info"`）。
/// 已安装过订阅者时返回错误，不会 panic。
pub fn init_logging(
    default_directives: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives)?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).try_init()?;
    debug!("Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_without_panic() {
        let _ = init_logging("recede_mpc=debug");
        assert!(init_logging("info").is_err());
    }
}
