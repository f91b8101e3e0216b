//! 计算延迟估计
//!
//! ```text
//! tau = (measure_delay ? 上次求解耗时 × multiplier : fixed_delay) + additional_delay
//! ```
//!
//! 第一个测量周期没有历史，测量部分取 0。

use crate::settings::MpcSettings;

/// 延迟估计器
#[derive(Debug, Clone, PartialEq)]
pub struct DelayEstimator {
    measure: bool,
    multiplier: f64,
    fixed: f64,
    additional: f64,
    last_optimize: Option<f64>,
}

impl DelayEstimator {
    pub fn from_settings(settings: &MpcSettings) -> Self {
        Self {
            measure: settings.measure_delay,
            multiplier: settings.delay_measurement_multiplier,
            fixed: settings.fixed_delay(),
            additional: settings.additional_delay(),
            last_optimize: None,
        }
    }

    /// 本周期的延迟估计（秒）
    pub fn estimate(&self) -> f64 {
        let base = if self.measure {
            self.last_optimize.unwrap_or(0.0) * self.multiplier
        } else {
            self.fixed
        };
        base + self.additional
    }

    /// 记录本周期求解耗时（秒）
    pub fn record(&mut self, optimize_duration: f64) {
        self.last_optimize = Some(optimize_duration.max(0.0));
    }

    pub fn last_optimize_duration(&self) -> Option<f64> {
        self.last_optimize
    }

    pub fn reset(&mut self) {
        self.last_optimize = None;
    }
}
