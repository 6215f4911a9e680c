// 状态管理模块

mod scope;
mod store;
mod value;

pub use scope::{VariableScope, Variables};
pub use store::{MemoryStore, ProcessStore};
pub use value::VariableValue;
