// Flow 模块 - 流程图模型

pub mod builder;
pub mod conditions;
pub mod loader;
pub mod registry;
pub mod types;
pub mod validate;

// 重新导出核心类型
pub use builder::ProcessBuilder;
pub use conditions::{Condition, ConditionFn};
pub use registry::DefinitionRegistry;
pub use types::{Node, NodeKind, ProcessDefinition, SequenceFlow};
pub use validate::validate;
