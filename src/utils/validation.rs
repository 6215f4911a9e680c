use crate::error::{FlowError, GraphError, Result};
use anyhow::anyhow;

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证流程定义 key
    pub fn validate_definition_key(key: &str) -> std::result::Result<(), GraphError> {
        if key.trim().is_empty() {
            return Err(GraphError::EmptyKey);
        }
        Self::validate_identifier(key)
    }

    /// 验证节点 ID
    pub fn validate_node_id(node_id: &str) -> std::result::Result<(), GraphError> {
        Self::validate_identifier(node_id)
    }

    /// 验证候选组名称
    pub fn validate_candidate_group(group: &str) -> std::result::Result<(), GraphError> {
        if group.trim().is_empty() {
            return Err(GraphError::InvalidIdentifier(group.to_string()));
        }
        Ok(())
    }

    /// 标识符只允许字母、数字、下划线、短横线和点
    fn validate_identifier(id: &str) -> std::result::Result<(), GraphError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.');
        if valid {
            Ok(())
        } else {
            Err(GraphError::InvalidIdentifier(id.to_string()))
        }
    }

    /// 验证推进步数上限
    pub fn validate_max_steps(max_steps: u32) -> Result<()> {
        if max_steps == 0 {
            return Err(FlowError::Other(anyhow!("max_steps 必须大于 0")));
        }
        if max_steps > 1_000_000 {
            tracing::warn!(max_steps, "max_steps 过大，失控的推进可能长时间占用实例锁");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_node_id() {
        assert!(ConfigValidator::validate_node_id("").is_err());
        assert!(ConfigValidator::validate_node_id("approveTask").is_ok());
        assert!(ConfigValidator::validate_node_id("manager-approval").is_ok());
        assert!(ConfigValidator::validate_node_id("end_1").is_ok());
        assert!(ConfigValidator::validate_node_id("node@1").is_err());
        assert!(ConfigValidator::validate_node_id("two words").is_err());
    }

    #[test]
    fn test_validate_definition_key() {
        assert_eq!(
            ConfigValidator::validate_definition_key("  "),
            Err(GraphError::EmptyKey)
        );
        assert!(ConfigValidator::validate_definition_key("holidayRequest").is_ok());
    }

    #[test]
    fn test_validate_candidate_group() {
        assert!(ConfigValidator::validate_candidate_group("").is_err());
        assert!(ConfigValidator::validate_candidate_group("managers").is_ok());
    }

    #[test]
    fn test_validate_max_steps() {
        assert!(ConfigValidator::validate_max_steps(0).is_err());
        assert!(ConfigValidator::validate_max_steps(256).is_ok());
    }
}
