//! # MPC 周期统计
//!
//! 每个控制周期追加一条 [`CycleRecord`]，追加后不再修改。
//! [`MpcSummary`] 从记录中计算聚合统计，仅用于离线分析，不参与控制决策。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 单个周期的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CycleOutcome {
    /// 求解器收敛，新策略已采用
    Converged { iterations: usize },

    /// 迭代预算内未收敛，保留上一策略
    NotConverged { iterations: usize },

    /// 求解器拒绝问题（如初始状态超出可行域）
    Rejected { reason: String },

    /// 超出硬实时截止时间，结果被丢弃
    DeadlineMissed { overrun_us: u64 },
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Converged { .. })
    }
}

/// 周期记录（追加后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    /// 周期序号（从 0 开始）
    pub cycle: u64,

    /// 调用方给出的当前时间（秒）
    pub current_time: f64,

    /// 求解耗时（微秒）
    pub optimize_duration_us: u64,

    /// 本周期使用的延迟估计 tau（秒）
    pub delay: f64,

    /// 是否使用热启动
    pub warm_started: bool,

    /// 周期结果
    pub outcome: CycleOutcome,

    /// 后截断丢弃的步数
    pub truncated_steps: usize,

    /// 返回给调用方的策略步数
    pub policy_steps: usize,
}

impl CycleRecord {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// MPC 汇总统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpcSummary {
    /// 总周期数
    pub total_cycles: u64,

    /// 失败周期数（未收敛 / 被拒绝 / 超时）
    pub failed_cycles: u64,

    /// 超出截止时间的周期数
    pub deadline_misses: u64,

    /// 使用热启动的周期数
    pub warm_started_cycles: u64,

    /// 平均求解耗时（微秒）
    pub mean_optimize_us: f64,

    /// 最小求解耗时（微秒）
    pub min_optimize_us: u64,

    /// 最大求解耗时（微秒）
    pub max_optimize_us: u64,

    /// 求解耗时标准差（微秒）
    pub std_dev_optimize_us: f64,

    /// 平均延迟估计（秒）
    pub mean_delay_s: f64,

    /// 最大延迟估计（秒）
    pub max_delay_s: f64,

    /// 后截断累计丢弃步数
    pub total_truncated_steps: u64,
}

impl MpcSummary {
    /// 从周期记录计算汇总统计
    pub fn calculate(records: &[CycleRecord]) -> Self {
        if records.is_empty() {
            return Self {
                total_cycles: 0,
                failed_cycles: 0,
                deadline_misses: 0,
                warm_started_cycles: 0,
                mean_optimize_us: 0.0,
                min_optimize_us: 0,
                max_optimize_us: 0,
                std_dev_optimize_us: 0.0,
                mean_delay_s: 0.0,
                max_delay_s: 0.0,
                total_truncated_steps: 0,
            };
        }

        let n = records.len() as f64;
        let durations: Vec<u64> = records.iter().map(|r| r.optimize_duration_us).collect();

        let sum: u64 = durations.iter().sum();
        let mean = sum as f64 / n;
        let min = *durations.iter().min().unwrap_or(&0);
        let max = *durations.iter().max().unwrap_or(&0);

        // 计算标准差
        let variance = durations
            .iter()
            .map(|&x| {
                let diff = x as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;

        let mean_delay = records.iter().map(|r| r.delay).sum::<f64>() / n;
        let max_delay = records.iter().map(|r| r.delay).fold(0.0_f64, f64::max);

        Self {
            total_cycles: records.len() as u64,
            failed_cycles: records.iter().filter(|r| !r.is_success()).count() as u64,
            deadline_misses: records
                .iter()
                .filter(|r| matches!(r.outcome, CycleOutcome::DeadlineMissed { .. }))
                .count() as u64,
            warm_started_cycles: records.iter().filter(|r| r.warm_started).count() as u64,
            mean_optimize_us: mean,
            min_optimize_us: min,
            max_optimize_us: max,
            std_dev_optimize_us: variance.sqrt(),
            mean_delay_s: mean_delay,
            max_delay_s: max_delay,
            total_truncated_steps: records.iter().map(|r| r.truncated_steps as u64).sum(),
        }
    }

    /// 成功率（%）
    pub fn success_rate(&self) -> f64 {
        if self.total_cycles == 0 {
            return 0.0;
        }
        let ok = self.total_cycles - self.failed_cycles;
        (ok as f64 / self.total_cycles as f64) * 100.0
    }
}

impl fmt::Display for MpcSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "================ MPC SUMMARY ================")?;
        writeln!(f, "cycles:              {}", self.total_cycles)?;
        writeln!(
            f,
            "failed cycles:       {} ({:.1}% success)",
            self.failed_cycles,
            self.success_rate()
        )?;
        writeln!(f, "deadline misses:     {}", self.deadline_misses)?;
        writeln!(f, "warm-started cycles: {}", self.warm_started_cycles)?;
        writeln!(
            f,
            "optimize time [us]:  mean {:.1} / min {} / max {} / std {:.1}",
            self.mean_optimize_us,
            self.min_optimize_us,
            self.max_optimize_us,
            self.std_dev_optimize_us
        )?;
        writeln!(
            f,
            "delay [ms]:          mean {:.3} / max {:.3}",
            self.mean_delay_s * 1e3,
            self.max_delay_s * 1e3
        )?;
        write!(f, "truncated steps:     {}", self.total_truncated_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cycle: u64, duration_us: u64, outcome: CycleOutcome) -> CycleRecord {
        CycleRecord {
            cycle,
            current_time: cycle as f64 * 0.01,
            optimize_duration_us: duration_us,
            delay: duration_us as f64 * 1e-6,
            warm_started: cycle > 0,
            outcome,
            truncated_steps: 1,
            policy_steps: 100,
        }
    }

    #[test]
    fn test_summary_empty() {
        let summary = MpcSummary::calculate(&[]);
        assert_eq!(summary.total_cycles, 0);
        assert_eq!(summary.mean_optimize_us, 0.0);
        assert_eq!(summary.success_rate(), 0.0);
    }

    #[test]
    fn test_summary_statistics() {
        let records = vec![
            record(0, 100, CycleOutcome::Converged { iterations: 3 }),
            record(1, 150, CycleOutcome::Converged { iterations: 2 }),
            record(2, 200, CycleOutcome::NotConverged { iterations: 5 }),
            record(3, 120, CycleOutcome::DeadlineMissed { overrun_us: 20 }),
            record(4, 180, CycleOutcome::Rejected {
                reason: "out of bounds".to_string(),
            }),
        ];
        let summary = MpcSummary::calculate(&records);

        assert_eq!(summary.total_cycles, 5);
        assert_eq!(summary.failed_cycles, 3);
        assert_eq!(summary.deadline_misses, 1);
        assert_eq!(summary.warm_started_cycles, 4);
        assert_eq!(summary.min_optimize_us, 100);
        assert_eq!(summary.max_optimize_us, 200);
        assert_eq!(summary.total_truncated_steps, 5);

        let expected_avg = (100 + 150 + 200 + 120 + 180) as f64 / 5.0;
        assert!((summary.mean_optimize_us - expected_avg).abs() < 0.01);
        assert!((summary.max_delay_s - 200e-6).abs() < 1e-12);
        assert!((summary.success_rate() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_display() {
        let records = vec![record(0, 100, CycleOutcome::Converged { iterations: 1 })];
        let text = format!("{}", MpcSummary::calculate(&records));
        assert!(text.contains("MPC SUMMARY"));
        assert!(text.contains("cycles:              1"));
        assert!(text.contains("100.0% success"));
    }
}
