//! # 状态轨迹
//!
//! 有序状态采样序列，第 `k` 个采样对应时间 `t0 + k·dt`。
//! 长度为 K 的策略对应 K+1 个状态采样（初始状态 + 每步结束状态）。

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::{StateVector, TIME_EPSILON};

/// 状态轨迹
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    t0: f64,
    dt: f64,
    states: Vec<StateVector>,
}

impl Trajectory {
    /// 创建轨迹
    ///
    /// # 错误
    ///
    /// - `InvalidTimestep`: `dt` 非正或非有限
    /// - `EmptyTrajectory`: 没有任何采样
    /// - `DimensionMismatch`: 采样维度不一致
    pub fn new(t0: f64, dt: f64, states: Vec<StateVector>) -> Result<Self, PolicyError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(PolicyError::InvalidTimestep(dt));
        }
        let Some(first) = states.first() else {
            return Err(PolicyError::EmptyTrajectory);
        };
        let dim = first.len();
        if let Some((index, x)) = states.iter().enumerate().find(|(_, x)| x.len() != dim) {
            return Err(PolicyError::DimensionMismatch {
                index,
                expected: dim,
                actual: x.len(),
            });
        }
        Ok(Self { t0, dt, states })
    }

    /// 常值轨迹（`samples` 个相同状态）
    pub fn constant(
        state: StateVector,
        samples: usize,
        dt: f64,
        t0: f64,
    ) -> Result<Self, PolicyError> {
        Self::new(t0, dt, vec![state; samples.max(1)])
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// 构造保证非空，始终返回 `false`
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn t0(&self) -> f64 {
        self.t0
    }

    pub fn set_t0(&mut self, t0: f64) {
        self.t0 = t0;
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// 最后一个采样的时间
    pub fn end_time(&self) -> f64 {
        self.t0 + (self.len().saturating_sub(1)) as f64 * self.dt
    }

    pub fn state_dim(&self) -> usize {
        self.states[0].len()
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    /// 初始状态
    pub fn front(&self) -> &StateVector {
        &self.states[0]
    }

    /// 终端状态
    pub fn back(&self) -> &StateVector {
        &self.states[self.states.len() - 1]
    }

    /// 替换初始状态（热启动拼接用）
    pub fn set_initial_state(&mut self, state: StateVector) {
        self.states[0] = state;
    }

    /// 线性插值求时间 `time` 处的状态，超出范围时钳位到端点
    pub fn state_at(&self, time: f64) -> StateVector {
        let offset = (time - self.t0) / self.dt;
        if !offset.is_finite() || offset <= 0.0 {
            return self.front().clone();
        }
        let last = self.len() - 1;
        let k = (offset + TIME_EPSILON).floor() as usize;
        if k >= last {
            return self.back().clone();
        }
        let alpha = (offset - k as f64).clamp(0.0, 1.0);
        &self.states[k] * (1.0 - alpha) + &self.states[k + 1] * alpha
    }

    /// 丢弃前 `steps` 个采样，`t0` 随之后移；至少保留一个采样
    ///
    /// 返回实际丢弃的数量。
    pub fn truncate_front(&mut self, steps: usize) -> usize {
        let n = steps.min(self.len() - 1);
        if n > 0 {
            self.states.drain(..n);
            self.t0 += n as f64 * self.dt;
        }
        n
    }

    /// 调整采样数量：多则截断，少则重复最后一个状态
    pub fn resize_hold_last(&mut self, samples: usize) {
        let samples = samples.max(1);
        if samples <= self.len() {
            self.states.truncate(samples);
        } else {
            let last = self.back().clone();
            self.states.resize(samples, last);
        }
    }
}
