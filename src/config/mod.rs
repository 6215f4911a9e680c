pub mod env;

pub use env::EnvConfig;

use crate::error::Result;
use crate::utils::ConfigValidator;

/// 引擎配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// 单次推进允许经过的最大节点数
    pub max_steps: u32,
    /// 是否记录节点历史
    pub record_history: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 256,
            record_history: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_history(mut self, record_history: bool) -> Self {
        self.record_history = record_history;
        self
    }

    /// 从环境变量读取配置
    ///
    /// - FLOWCORE_MAX_STEPS: 单次推进的步数上限
    /// - FLOWCORE_RECORD_HISTORY: `true` / `false`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(max_steps) = EnvConfig::get_env_parsed::<u32>("FLOWCORE_MAX_STEPS")? {
            config.max_steps = max_steps;
        }
        if let Some(record) = EnvConfig::get_env_parsed::<bool>("FLOWCORE_RECORD_HISTORY")? {
            config.record_history = record;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_max_steps(self.max_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = EngineConfig::new().with_max_steps(8).with_history(false);
        assert_eq!(config.max_steps, 8);
        assert!(!config.record_history);
        assert!(EngineConfig::new().with_max_steps(0).validate().is_err());
    }

    #[test]
    fn from_env_reads_overrides() {
        std::env::set_var("FLOWCORE_MAX_STEPS", "32");
        std::env::set_var("FLOWCORE_RECORD_HISTORY", "false");
        let config = EngineConfig::from_env().unwrap();
        std::env::remove_var("FLOWCORE_MAX_STEPS");
        std::env::remove_var("FLOWCORE_RECORD_HISTORY");

        assert_eq!(config.max_steps, 32);
        assert!(!config.record_history);
    }
}
