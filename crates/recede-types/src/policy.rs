//! # 状态反馈策略
//!
//! 时间索引的控制律：前馈控制序列 + 可选反馈增益矩阵，以固定步长 `dt` 采样，
//! 起始时间戳为 `t0`。
//!
//! # 控制律
//!
//! ```text
//! k = floor((t - t0) / dt)            （钳位到 [0, K-1]）
//! u(t, x) = u_ff[k] + K[k] · x        （无反馈时 K[k] = 0）
//! ```
//!
//! # 不变量
//!
//! - `feedforward.len() == feedback.len()`（存在反馈时）
//! - 所有前馈向量维度一致，所有增益矩阵行数等于控制维度
//!
//! 不变量由构造函数保证，之后的所有修改方法都同时操作两个序列。

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::{ControlVector, FeedbackMatrix, StateVector, TIME_EPSILON};

/// 状态反馈策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// 起始时间戳（秒）
    t0: f64,

    /// 采样步长（秒）
    dt: f64,

    /// 前馈控制序列
    feedforward: Vec<ControlVector>,

    /// 反馈增益序列（可选）
    feedback: Option<Vec<FeedbackMatrix>>,
}

impl Policy {
    /// 创建策略并校验不变量
    ///
    /// # 错误
    ///
    /// - `InvalidTimestep`: `dt` 非正或非有限
    /// - `LengthMismatch`: 反馈序列长度与前馈不一致
    /// - `DimensionMismatch`: 序列内维度不一致
    pub fn new(
        t0: f64,
        dt: f64,
        feedforward: Vec<ControlVector>,
        feedback: Option<Vec<FeedbackMatrix>>,
    ) -> Result<Self, PolicyError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(PolicyError::InvalidTimestep(dt));
        }

        if let Some(first) = feedforward.first() {
            let control_dim = first.len();
            for (index, u) in feedforward.iter().enumerate() {
                if u.len() != control_dim {
                    return Err(PolicyError::DimensionMismatch {
                        index,
                        expected: control_dim,
                        actual: u.len(),
                    });
                }
            }

            if let Some(gains) = &feedback {
                for (index, k) in gains.iter().enumerate() {
                    if k.nrows() != control_dim {
                        return Err(PolicyError::DimensionMismatch {
                            index,
                            expected: control_dim,
                            actual: k.nrows(),
                        });
                    }
                }
            }
        }

        if let Some(gains) = &feedback
            && gains.len() != feedforward.len()
        {
            return Err(PolicyError::LengthMismatch {
                feedforward: feedforward.len(),
                feedback: gains.len(),
            });
        }

        Ok(Self {
            t0,
            dt,
            feedforward,
            feedback,
        })
    }

    /// 全零策略（零前馈 + 零反馈）
    ///
    /// 冷启动时的默认初始猜测。不做校验，调用方负责传入正的 `dt`。
    pub fn zeros(steps: usize, state_dim: usize, control_dim: usize, dt: f64, t0: f64) -> Self {
        Self {
            t0,
            dt,
            feedforward: vec![ControlVector::zeros(control_dim); steps],
            feedback: Some(vec![FeedbackMatrix::zeros(control_dim, state_dim); steps]),
        }
    }

    /// 步数 K
    pub fn len(&self) -> usize {
        self.feedforward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feedforward.is_empty()
    }

    /// 起始时间戳（秒）
    pub fn t0(&self) -> f64 {
        self.t0
    }

    /// 设置起始时间戳
    pub fn set_t0(&mut self, t0: f64) {
        self.t0 = t0;
    }

    /// 采样步长（秒）
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// 策略覆盖的时间长度（秒）
    pub fn duration(&self) -> f64 {
        self.len() as f64 * self.dt
    }

    /// 策略结束时间（秒）
    pub fn end_time(&self) -> f64 {
        self.t0 + self.duration()
    }

    /// 控制维度（空策略返回 `None`）
    pub fn control_dim(&self) -> Option<usize> {
        self.feedforward.first().map(|u| u.len())
    }

    pub fn feedforward(&self) -> &[ControlVector] {
        &self.feedforward
    }

    pub fn feedback(&self) -> Option<&[FeedbackMatrix]> {
        self.feedback.as_deref()
    }

    pub fn has_feedback(&self) -> bool {
        self.feedback.is_some()
    }

    /// 时间 `time` 对应的步索引
    ///
    /// 早于 `t0` 的时间映射到 0，晚于结束时间的映射到最后一步。
    /// 空策略返回 `None`。
    pub fn step_index(&self, time: f64) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let offset = (time - self.t0) / self.dt;
        if !offset.is_finite() || offset <= 0.0 {
            return Some(0);
        }
        let k = (offset + TIME_EPSILON).floor() as usize;
        Some(k.min(self.len() - 1))
    }

    /// 在时间 `time`、状态 `state` 下计算控制量
    ///
    /// 被控对象按 `currentPlantTime - t0` 索引策略，即调用此方法。
    pub fn control(&self, time: f64, state: &StateVector) -> Option<ControlVector> {
        let k = self.step_index(time)?;
        let mut u = self.feedforward[k].clone();
        if let Some(gains) = &self.feedback {
            let gain = &gains[k];
            if gain.ncols() == state.len() {
                u += gain * state;
            }
        }
        Some(u)
    }

    /// 丢弃前 `steps` 步，`t0` 随之后移
    ///
    /// 返回实际丢弃的步数（不超过当前长度）。
    pub fn truncate_front(&mut self, steps: usize) -> usize {
        let n = steps.min(self.len());
        if n == 0 {
            return 0;
        }
        self.feedforward.drain(..n);
        if let Some(gains) = &mut self.feedback {
            gains.drain(..n);
        }
        self.t0 += n as f64 * self.dt;
        n
    }

    /// 只保留前 `steps` 步
    pub fn truncate_back(&mut self, steps: usize) {
        self.feedforward.truncate(steps);
        if let Some(gains) = &mut self.feedback {
            gains.truncate(steps);
        }
    }

    /// 在尾部追加 `steps` 步，重复最后一步的前馈与增益
    ///
    /// 空策略无法外推，返回 `false`。
    pub fn extend_hold_last(&mut self, steps: usize) -> bool {
        let Some(last_u) = self.feedforward.last().cloned() else {
            return false;
        };
        let last_k = self.feedback.as_ref().and_then(|g| g.last().cloned());
        for _ in 0..steps {
            self.feedforward.push(last_u.clone());
        }
        if let (Some(gains), Some(k)) = (&mut self.feedback, last_k) {
            for _ in 0..steps {
                gains.push(k.clone());
            }
        }
        true
    }

    /// 在尾部追加 `steps` 步给定的前馈与增益
    ///
    /// 策略不含反馈时忽略 `gain`。
    pub fn extend_with(&mut self, steps: usize, feedforward: &ControlVector, gain: &FeedbackMatrix) {
        for _ in 0..steps {
            self.feedforward.push(feedforward.clone());
        }
        if let Some(gains) = &mut self.feedback {
            for _ in 0..steps {
                gains.push(gain.clone());
            }
        }
    }
}
