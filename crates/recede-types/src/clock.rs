//! # 单调时钟
//!
//! 控制器用时钟测量求解耗时（延迟估计、后截断、截止时间）。
//! 时钟只提供单调读数，读数的零点由实现决定。
//!
//! | 实现 | 用途 |
//! |------|------|
//! | [`SystemClock`] | 真实运行，基于 `Instant` |
//! | [`ManualClock`] | 测试与离线仿真，由调用方推进 |

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 单调时钟
pub trait Clock: Send + Sync + Debug {
    /// 当前读数（自时钟零点起）
    fn now(&self) -> Duration;
}

/// 基于 `Instant` 的系统时钟
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// 手动推进的时钟
///
/// 使用原子计数器（纳秒），可在线程间共享（`Arc<ManualClock>`）。
///
/// ```rust
/// use recede_types::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// clock.advance(Duration::from_micros(250));
/// assert_eq!(clock.now(), Duration::from_micros(250));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 向前推进
    pub fn advance(&self, by: Duration) {
        let ns = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.now_ns.fetch_add(ns, Ordering::Relaxed);
    }

    /// 设置读数（只允许前进，回退请求被忽略）
    pub fn set(&self, to: Duration) {
        let ns = u64::try_from(to.as_nanos()).unwrap_or(u64::MAX);
        self.now_ns.fetch_max(ns, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns.load(Ordering::Relaxed))
    }
}

/// 截止时间（绑定到某个时钟的绝对读数）
#[derive(Debug, Clone)]
pub struct Deadline {
    clock: Arc<dyn Clock>,
    at: Duration,
}

impl Deadline {
    /// 从现在起 `budget` 之后到期
    pub fn after(clock: Arc<dyn Clock>, budget: Duration) -> Self {
        let at = clock.now().saturating_add(budget);
        Self { clock, at }
    }

    /// 是否已到期
    pub fn is_expired(&self) -> bool {
        self.clock.now() >= self.at
    }

    /// 剩余时间（已到期返回 0）
    pub fn remaining(&self) -> Duration {
        self.at.saturating_sub(self.clock.now())
    }
}
