use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::value::VariableValue;

/// 变量映射，用于调用方传入与快照导出
pub type Variables = BTreeMap<String, VariableValue>;

/// 流程实例的变量作用域
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableScope {
    variables: Variables,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_variables(variables: Variables) -> Self {
        Self { variables }
    }

    pub fn get(&self, key: &str) -> Option<&VariableValue> {
        self.variables.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<VariableValue>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<VariableValue> {
        self.variables.remove(key)
    }

    /// 合并变量，已有键被新值覆盖
    pub fn merge<I>(&mut self, variables: I)
    where
        I: IntoIterator<Item = (String, VariableValue)>,
    {
        self.variables.extend(variables);
    }

    pub fn snapshot(&self) -> Variables {
        self.variables.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariableValue)> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// 便捷宏：构造 `Variables`
#[macro_export]
macro_rules! variables {
    () => {
        $crate::state::Variables::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::state::Variables::new();
        $(map.insert($key.to_string(), $crate::state::VariableValue::from($value));)+
        map
    }};
}
