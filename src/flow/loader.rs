use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context};
use serde_json::Value;

use crate::error::{FlowError, Result};
use crate::flow::conditions::Condition;
use crate::flow::types::ProcessDefinition;
use crate::flow::validate::validate;

/// 从 JSON 加载流程定义
///
/// JSON 只是图的序列化形式，加载后立即执行结构校验。
/// 顺序流的 `condition` 可以是表达式字符串（如 `"${approved}"`），
/// 也可以是结构化对象（如 `{"type": "is_true", "key": "approved"}`）。
impl ProcessDefinition {
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| FlowError::Other(anyhow!("Failed to parse process definition: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Self> {
        parse_expression_conditions(&mut value)?;
        let definition: ProcessDefinition = serde_json::from_value(value).map_err(|e| {
            FlowError::Other(anyhow!("Failed to parse process definition value: {}", e))
        })?;
        validate(&definition)?;
        Ok(definition)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read process definition `{}`", path.display()))?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FlowError::Other(anyhow!("Failed to serialize process definition: {}", e)))
    }
}

/// 先把字符串形式的条件解析为结构化条件，表达式错误保持 `InvalidCondition`
fn parse_expression_conditions(value: &mut Value) -> Result<()> {
    let Some(flows) = value.get_mut("flows").and_then(Value::as_array_mut) else {
        return Ok(());
    };
    for flow in flows {
        let Some(Value::String(expression)) = flow.get("condition") else {
            continue;
        };
        let condition = Condition::parse(expression)?;
        flow["condition"] = serde_json::to_value(&condition)
            .map_err(|e| FlowError::Other(anyhow!("Failed to encode condition: {}", e)))?;
    }
    Ok(())
}
