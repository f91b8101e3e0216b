//! 控制器阶段
//!
//! `Idle → Running → Terminated`。`Terminated` 拒绝 `run()`，只能 `reset()` 回到 `Idle`。

use std::sync::atomic::{AtomicU8, Ordering};

/// 控制器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MpcPhase {
    /// 尚未执行任何周期（或刚 reset）
    #[default]
    Idle = 0,

    /// 至少执行过一个周期
    Running = 1,

    /// 时域已到达
    Terminated = 2,
}

impl MpcPhase {
    /// 从 u8 转换，无效值视为 Idle
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Terminated,
            _ => Self::Idle,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_terminated(self) -> bool {
        self == Self::Terminated
    }
}

/// 阶段的原子镜像，供监控线程无锁读取
///
/// ```rust
/// use recede_mpc::phase::{AtomicMpcPhase, MpcPhase};
/// use std::sync::atomic::Ordering;
///
/// let phase = AtomicMpcPhase::new(MpcPhase::Idle);
/// phase.set(MpcPhase::Running, Ordering::Release);
/// assert_eq!(phase.get(Ordering::Acquire), MpcPhase::Running);
/// ```
#[derive(Debug, Default)]
pub struct AtomicMpcPhase {
    inner: AtomicU8,
}

impl AtomicMpcPhase {
    pub fn new(phase: MpcPhase) -> Self {
        Self {
            inner: AtomicU8::new(phase.as_u8()),
        }
    }

    pub fn get(&self, ordering: Ordering) -> MpcPhase {
        MpcPhase::from_u8(self.inner.load(ordering))
    }

    pub fn set(&self, phase: MpcPhase, ordering: Ordering) {
        self.inner.store(phase.as_u8(), ordering);
    }
}
