use crate::error::{FlowError, Result};
use anyhow::anyhow;
use std::env;
use std::str::FromStr;

/// 环境变量配置管理
pub struct EnvConfig;

impl EnvConfig {
    /// 从环境变量获取值
    pub fn get_env(key: &str) -> Result<String> {
        env::var(key).map_err(|_| FlowError::Other(anyhow!("环境变量 '{}' 未设置", key)))
    }

    /// 获取可选的环境变量
    pub fn get_env_optional(key: &str) -> Option<String> {
        env::var(key).ok()
    }

    /// 读取并解析环境变量；未设置时返回 `None`，格式错误时返回错误
    pub fn get_env_parsed<T>(key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::get_env_optional(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
                FlowError::Other(anyhow!("环境变量 '{}' 的值 '{}' 无效: {}", key, raw, e))
            }),
        }
    }

    /// 检查是否启用调试模式
    pub fn is_debug_mode() -> bool {
        env::var("FLOWCORE_DEBUG").is_ok()
    }
}

/// 宏：简化环境变量获取
#[macro_export]
macro_rules! env_var {
    ($key:expr) => {
        $crate::config::EnvConfig::get_env($key)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_parsed() {
        env::set_var("FLOWCORE_TEST_PARSED", "42");
        assert_eq!(
            EnvConfig::get_env_parsed::<u32>("FLOWCORE_TEST_PARSED").unwrap(),
            Some(42)
        );
        env::set_var("FLOWCORE_TEST_PARSED", "many");
        assert!(EnvConfig::get_env_parsed::<u32>("FLOWCORE_TEST_PARSED").is_err());
        env::remove_var("FLOWCORE_TEST_PARSED");
        assert_eq!(
            EnvConfig::get_env_parsed::<u32>("FLOWCORE_TEST_PARSED").unwrap(),
            None
        );
    }

    #[test]
    fn test_get_env_missing() {
        assert!(EnvConfig::get_env("FLOWCORE_TEST_SURELY_MISSING").is_err());
        assert!(crate::env_var!("FLOWCORE_TEST_SURELY_MISSING").is_err());
    }
}
