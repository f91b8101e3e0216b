//! # Recede MPC - 滚动时域控制循环
//!
//! 每个周期围绕当前状态与时间重新求解有限时域最优控制问题，
//! 并向调用方交付持续更新的反馈策略。
//!
//! ## 模块
//!
//! - `controller` - [`MpcController`]：周期编排、失败回退、周期记录
//! - `warm_start` - [`WarmStartTransformer`]：上一解的平移、延长与拼接
//! - `horizon` - [`HorizonPolicy`]：时域模式与终止判定
//! - `delay` - [`DelayEstimator`]：计算延迟估计
//! - `settings` - [`MpcSettings`]：配置（TOML 加载与校验）
//! - `phase` - [`MpcPhase`] 与原子镜像 [`AtomicMpcPhase`]
//! - `error` - [`MpcError`]
//!
//! 控制器只通过 [`recede_optcon::TrajectoryOptimizer`] 访问求解后端。

pub mod controller;
pub mod delay;
pub mod error;
pub mod horizon;
pub mod phase;
pub mod settings;
pub mod warm_start;

pub use controller::{MpcController, MpcOutput};
pub use delay::DelayEstimator;
pub use error::{MpcError, Result};
pub use horizon::HorizonPolicy;
pub use phase::{AtomicMpcPhase, MpcPhase};
pub use settings::{HorizonMode, MpcSettings, TailExtension};
pub use warm_start::WarmStartTransformer;
