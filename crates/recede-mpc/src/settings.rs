//! # MPC 配置
//!
//! 运行期间不可变。可在代码中构造，也可从 TOML 加载：
//!
//! ```toml
//! dt = 0.001
//! max_iterations = 5
//! horizon_mode = "fixed_final_time"
//! state_forward_integration = true
//! post_truncation = true
//! measure_delay = true
//! delay_measurement_multiplier = 1.0
//! additional_delay_us = 0
//! tail_extension = "hold_last"
//! ```
//!
//! 缺省字段取 [`MpcSettings::default`] 的值。

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MpcError, Result};

/// 时域模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizonMode {
    /// 终止时间固定：剩余时域 = 终止时间 − 当前时间，到达后终止
    #[default]
    FixedFinalTime,

    /// 恒定滚动时域：每个周期都求解相同长度，永不终止
    ConstantReceding,

    /// 终止时间固定，但时域不短于 `min_time_horizon`，永不终止
    FixedFinalTimeWithMinHorizon,

    /// 恒定滚动时域，运行 `final_time` 秒后终止
    RecedingWithFixedFinalTime,
}

/// 热启动尾部外推方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailExtension {
    /// 重复最后一步的前馈与增益
    #[default]
    HoldLast,

    /// 追加问题的名义控制，增益为零
    ProblemDefault,
}

/// MPC 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpcSettings {
    /// 策略采样步长（秒）
    pub dt: f64,

    /// 每周期最大优化迭代次数
    pub max_iterations: usize,

    pub horizon_mode: HorizonMode,

    /// 每周期都从零猜测开始（不热启动）
    pub cold_start: bool,

    /// 按上一策略把测量状态前向积分到 `当前时间 + 延迟`
    pub state_forward_integration: bool,

    /// 前向积分每个 `dt` 的 RK4 子步数
    pub integration_substeps: usize,

    /// 丢弃求解期间已经过去的策略前缀
    pub post_truncation: bool,

    /// 用上一周期的求解耗时估计本周期延迟
    pub measure_delay: bool,

    /// 测量延迟的放大系数
    pub delay_measurement_multiplier: f64,

    /// 不测量延迟时假定的延迟（微秒）
    pub fixed_delay_us: u64,

    /// 额外延迟（微秒，例如执行器延迟）
    pub additional_delay_us: u64,

    pub tail_extension: TailExtension,

    /// `FixedFinalTimeWithMinHorizon` 的最小时域（秒）
    pub min_time_horizon: Option<f64>,

    /// `RecedingWithFixedFinalTime` 的运行总时长（秒）
    pub final_time: Option<f64>,

    /// 单周期求解硬截止时间（微秒）
    pub deadline_us: Option<u64>,
}

impl Default for MpcSettings {
    fn default() -> Self {
        Self {
            dt: 0.001,
            max_iterations: 5,
            horizon_mode: HorizonMode::FixedFinalTime,
            cold_start: false,
            state_forward_integration: true,
            integration_substeps: 1,
            post_truncation: true,
            measure_delay: true,
            delay_measurement_multiplier: 1.0,
            fixed_delay_us: 0,
            additional_delay_us: 0,
            tail_extension: TailExtension::HoldLast,
            min_time_horizon: None,
            final_time: None,
            deadline_us: None,
        }
    }
}

impl MpcSettings {
    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(MpcError::Configuration(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        if self.max_iterations == 0 {
            return Err(MpcError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.integration_substeps == 0 {
            return Err(MpcError::Configuration(
                "integration_substeps must be at least 1".to_string(),
            ));
        }
        if !self.delay_measurement_multiplier.is_finite() || self.delay_measurement_multiplier < 0.0
        {
            return Err(MpcError::Configuration(format!(
                "delay_measurement_multiplier must be non-negative, got {}",
                self.delay_measurement_multiplier
            )));
        }
        if self.deadline_us == Some(0) {
            return Err(MpcError::Configuration(
                "deadline_us must be positive when set".to_string(),
            ));
        }

        match self.horizon_mode {
            HorizonMode::FixedFinalTimeWithMinHorizon => {
                require_positive("min_time_horizon", self.min_time_horizon)?;
            },
            HorizonMode::RecedingWithFixedFinalTime => {
                require_positive("final_time", self.final_time)?;
            },
            HorizonMode::FixedFinalTime | HorizonMode::ConstantReceding => {},
        }
        Ok(())
    }

    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// 从 TOML 文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MpcError::Configuration(e.to_string()))
    }

    /// 不测量延迟时假定的延迟（秒）
    pub fn fixed_delay(&self) -> f64 {
        Duration::from_micros(self.fixed_delay_us).as_secs_f64()
    }

    /// 额外延迟（秒）
    pub fn additional_delay(&self) -> f64 {
        Duration::from_micros(self.additional_delay_us).as_secs_f64()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_us.map(Duration::from_micros)
    }
}

fn require_positive(name: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(()),
        Some(v) => Err(MpcError::Configuration(format!(
            "{} must be positive, got {}",
            name, v
        ))),
        None => Err(MpcError::Configuration(format!(
            "{} is required by the selected horizon mode",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let s = MpcSettings::default();
        assert_eq!(s.dt, 0.001);
        assert_eq!(s.max_iterations, 5);
        assert_eq!(s.horizon_mode, HorizonMode::FixedFinalTime);
        assert!(s.state_forward_integration && s.post_truncation && s.measure_delay);
        assert!(!s.cold_start);
        assert_eq!(s.delay_measurement_multiplier, 1.0);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let s = MpcSettings::from_toml_str(
            r#"
            dt = 0.01
            horizon_mode = "constant_receding"
            tail_extension = "problem_default"
            additional_delay_us = 500
            "#,
        )
        .unwrap();
        assert_eq!(s.dt, 0.01);
        assert_eq!(s.horizon_mode, HorizonMode::ConstantReceding);
        assert_eq!(s.tail_extension, TailExtension::ProblemDefault);
        assert_eq!(s.max_iterations, 5);
        assert!((s.additional_delay() - 0.0005).abs() < 1e-12);
    }

    #[test]
    fn test_mode_specific_requirements() {
        let s = MpcSettings {
            horizon_mode: HorizonMode::FixedFinalTimeWithMinHorizon,
            ..Default::default()
        };
        let err = s.validate().unwrap_err();
        assert!(format!("{}", err).contains("min_time_horizon"));

        let s = MpcSettings {
            horizon_mode: HorizonMode::RecedingWithFixedFinalTime,
            final_time: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(s.validate(), Err(MpcError::Configuration(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for s in [
            MpcSettings {
                dt: 0.0,
                ..Default::default()
            },
            MpcSettings {
                max_iterations: 0,
                ..Default::default()
            },
            MpcSettings {
                delay_measurement_multiplier: -0.5,
                ..Default::default()
            },
            MpcSettings {
                deadline_us: Some(0),
                ..Default::default()
            },
        ] {
            assert!(matches!(s.validate(), Err(MpcError::Configuration(_))));
        }
    }

    #[test]
    fn test_parse_error() {
        let err = MpcSettings::from_toml_str("horizon_mode = \"sideways\"").unwrap_err();
        assert!(matches!(err, MpcError::Parse(_)));
    }

    #[test]
    fn test_load_from_file_and_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dt = 0.002\nmeasure_delay = false\nfixed_delay_us = 1500").unwrap();

        let s = MpcSettings::load_from_file(file.path()).unwrap();
        assert_eq!(s.dt, 0.002);
        assert!(!s.measure_delay);
        assert!((s.fixed_delay() - 0.0015).abs() < 1e-12);

        let text = s.to_toml_string().unwrap();
        assert_eq!(MpcSettings::from_toml_str(&text).unwrap(), s);
    }

    #[test]
    fn test_missing_file() {
        let err = MpcSettings::load_from_file("/nonexistent/recede/mpc.toml").unwrap_err();
        assert!(matches!(err, MpcError::Io(_)));
    }
}
