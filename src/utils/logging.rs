use std::env;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 默认过滤规则：引擎自身 info，其余 crate 只输出 warn
const DEFAULT_FILTER: &str = "flowcore=info,warn";
/// 调试模式：输出每一步令牌移动
const DEBUG_FILTER: &str = "flowcore=debug,info";

/// 日志配置
///
/// 支持通过环境变量配置：
/// - RUST_LOG: 覆盖过滤规则（优先级最高）
/// - FLOWCORE_DEBUG: 启用调试模式，附带文件、行号和线程信息
///
/// ```no_run
/// use flowcore::utils::LoggingConfig;
///
/// LoggingConfig::init();
/// tracing::info!("engine ready");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub filter: String,
    pub verbose: bool,
}

impl LoggingConfig {
    /// 读取环境变量得到配置，不安装订阅者
    pub fn from_env() -> Self {
        let verbose = Self::is_debug();
        let filter = env::var("RUST_LOG")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or_else(|| Self::default_filter(verbose).to_string());
        Self { filter, verbose }
    }

    pub fn default_filter(verbose: bool) -> &'static str {
        if verbose {
            DEBUG_FILTER
        } else {
            DEFAULT_FILTER
        }
    }

    /// 按环境变量初始化日志系统
    pub fn init() {
        Self::from_env().install();
    }

    /// 使用自定义过滤规则初始化
    pub fn init_with_filter(filter: &str) {
        Self {
            filter: filter.to_string(),
            verbose: Self::is_debug(),
        }
        .install();
    }

    /// 安装全局订阅者；已有订阅者时（例如测试中重复调用）保持原样
    pub fn install(&self) {
        let env_filter =
            EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let fmt_layer = fmt::layer()
            .with_target(self.verbose)
            .with_file(self.verbose)
            .with_line_number(self.verbose)
            .with_thread_ids(self.verbose);

        let installed = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .is_ok();

        if installed && self.verbose {
            tracing::debug!(filter = %self.filter, "调试模式已启用");
        }
    }

    /// 检查是否启用调试模式
    pub fn is_debug() -> bool {
        env::var("FLOWCORE_DEBUG").is_ok()
    }
}

/// 便捷宏：记录错误，可附带结构化字段（如 `instance_id = %id`）
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {
        tracing::error!(error = %$err, "操作失败")
    };
    ($err:expr, $($field:tt)+) => {
        tracing::error!(error = %$err, $($field)+, "操作失败")
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_mode_switches_default_filter() {
        assert_eq!(LoggingConfig::default_filter(false), "flowcore=info,warn");
        assert_eq!(LoggingConfig::default_filter(true), "flowcore=debug,info");
    }

    #[test]
    fn install_twice_keeps_first_subscriber() {
        let config = LoggingConfig {
            filter: "flowcore=trace".into(),
            verbose: false,
        };
        config.install();
        config.install();
        crate::log_error!("boom", instance_id = "inst-1");
    }
}
