//! # 时域策略
//!
//! 决定每个周期的剩余时域长度，以及何时终止。
//!
//! | 模式 | 剩余时域 | 终止条件 |
//! |------|----------|----------|
//! | `FixedFinalTime` | `T_final − t` | 剩余步数为 0 |
//! | `ConstantReceding` | `H` | 从不 |
//! | `FixedFinalTimeWithMinHorizon` | `max(T_final − t, H_min)` | 从不 |
//! | `RecedingWithFixedFinalTime` | `H` | `t − t_anchor ≥ final_time` |
//!
//! 其中 `T_final = t_anchor + H`，`t_anchor` 为第一次调用的当前时间。
//!
//! 终止时间固定的模式按策略起点计算步数并向下取整，策略不会越过 `T_final`。

use recede_types::{TIME_EPSILON, steps_for_duration};
use tracing::debug;

use crate::error::{MpcError, Result};
use crate::settings::{HorizonMode, MpcSettings};

/// 时域策略
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonPolicy {
    mode: HorizonMode,
    dt: f64,
    horizon: f64,
    min_time_horizon: Option<f64>,
    final_time: Option<f64>,
    anchor: Option<f64>,
}

impl HorizonPolicy {
    /// 创建时域策略
    ///
    /// # 错误
    ///
    /// 时域非正或不能被 `dt` 整除（相对容差 1e-9）时返回 `Configuration`。
    pub fn new(settings: &MpcSettings, horizon: f64) -> Result<Self> {
        check_divisible("time horizon", horizon, settings.dt)?;
        if let Some(min) = settings.min_time_horizon {
            check_divisible("min_time_horizon", min, settings.dt)?;
        }
        Ok(Self {
            mode: settings.horizon_mode,
            dt: settings.dt,
            horizon,
            min_time_horizon: settings.min_time_horizon,
            final_time: settings.final_time,
            anchor: None,
        })
    }

    pub fn mode(&self) -> HorizonMode {
        self.mode
    }

    /// 配置的时域长度（秒）
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    pub fn anchor(&self) -> Option<f64> {
        self.anchor
    }

    /// 以第一次调用的时间为锚点，已锚定时不变
    pub fn anchor_at(&mut self, time: f64) {
        if self.anchor.is_none() {
            debug!("Horizon anchored at t = {:.6}", time);
            self.anchor = Some(time);
        }
    }

    /// 终止时间（只有固定终止时间类模式才有）
    pub fn final_time(&self) -> Option<f64> {
        let anchor = self.anchor?;
        match self.mode {
            HorizonMode::FixedFinalTime | HorizonMode::FixedFinalTimeWithMinHorizon => {
                Some(anchor + self.horizon)
            },
            HorizonMode::RecedingWithFixedFinalTime => self.final_time.map(|f| anchor + f),
            HorizonMode::ConstantReceding => None,
        }
    }

    /// 时间 `time` 处的剩余时域（秒）
    ///
    /// 未锚定时视为在 `time` 锚定。
    pub fn remaining(&self, time: f64) -> f64 {
        let anchor = self.anchor.unwrap_or(time);
        let to_final = anchor + self.horizon - time;
        match self.mode {
            HorizonMode::FixedFinalTime => to_final.max(0.0),
            HorizonMode::ConstantReceding | HorizonMode::RecedingWithFixedFinalTime => self.horizon,
            HorizonMode::FixedFinalTimeWithMinHorizon => {
                to_final.max(self.min_time_horizon.unwrap_or(self.dt))
            },
        }
    }

    /// 剩余时域对应的步数
    pub fn steps(&self, time: f64) -> usize {
        let remaining = self.remaining(time);
        match self.mode {
            HorizonMode::ConstantReceding | HorizonMode::RecedingWithFixedFinalTime => {
                steps_for_duration(remaining, self.dt)
            },
            HorizonMode::FixedFinalTime | HorizonMode::FixedFinalTimeWithMinHorizon => {
                steps_within(remaining, self.dt)
            },
        }
    }

    /// 是否已到达时域终点
    pub fn is_reached(&self, time: f64) -> bool {
        match self.mode {
            HorizonMode::FixedFinalTime => self.steps(time) == 0,
            HorizonMode::ConstantReceding | HorizonMode::FixedFinalTimeWithMinHorizon => false,
            HorizonMode::RecedingWithFixedFinalTime => {
                let anchor = self.anchor.unwrap_or(time);
                match self.final_time {
                    Some(total) => time - anchor >= total - TIME_EPSILON,
                    None => false,
                }
            },
        }
    }

    /// 清除锚点，可选地修改时域长度
    pub fn reset(&mut self, new_horizon: Option<f64>) -> Result<()> {
        if let Some(horizon) = new_horizon {
            check_divisible("time horizon", horizon, self.dt)?;
            self.horizon = horizon;
        }
        self.anchor = None;
        Ok(())
    }
}

/// 不超过 `duration` 的整步数，离整数 1e-9 以内的比值先吸附
fn steps_within(duration: f64, dt: f64) -> usize {
    if !duration.is_finite() || !dt.is_finite() || dt <= 0.0 || duration <= TIME_EPSILON {
        return 0;
    }
    let ratio = duration / dt;
    (ratio + 1e-9 * ratio.max(1.0)).floor() as usize
}

fn check_divisible(what: &str, value: f64, dt: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(MpcError::Configuration(format!(
            "{} must be positive, got {}",
            what, value
        )));
    }
    let ratio = value / dt;
    let remainder = value - ratio.round() * dt;
    if (ratio - ratio.round()).abs() > 1e-9 * ratio.max(1.0) || ratio.round() < 1.0 {
        return Err(MpcError::Configuration(format!(
            "{} {} is not a multiple of dt {} (remainder {:e})",
            what, value, dt, remainder
        )));
    }
    Ok(())
}
