use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::flow::types::ProcessDefinition;
use crate::flow::validate::validate;

/// 流程定义注册表
#[derive(Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<String, Arc<ProcessDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// 校验后注册；同 key 的旧定义被替换，已运行的实例仍持有旧定义
    pub fn register(&mut self, definition: ProcessDefinition) -> Result<Arc<ProcessDefinition>> {
        validate(&definition)?;
        let definition = Arc::new(definition);
        self.definitions
            .insert(definition.key.clone(), Arc::clone(&definition));
        Ok(definition)
    }

    pub fn get(&self, key: &str) -> Option<Arc<ProcessDefinition>> {
        self.definitions.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.definitions.contains_key(key)
    }

    pub fn list(&self) -> impl Iterator<Item = &Arc<ProcessDefinition>> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::ProcessBuilder;

    #[test]
    fn register_replaces_definition_with_same_key() {
        let mut registry = DefinitionRegistry::new();
        let mut first = ProcessBuilder::new("review");
        first.add_start("start").add_end("end").connect("start", "end");
        let mut second = ProcessBuilder::new("review");
        second
            .name("Review v2")
            .add_start("start")
            .add_user_task("check", "reviewers")
            .add_end("end")
            .connect("start", "check")
            .connect("check", "end");

        let old = registry.register(first.build().unwrap()).unwrap();
        registry.register(second.build().unwrap()).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("review").unwrap().display_name(), "Review v2");
        assert_eq!(old.nodes.len(), 2, "held definitions are not mutated");
    }
}
