// 运行时执行引擎模块

mod engine;
mod executor;
mod types;

pub use engine::ProcessEngine;
pub use types::{InstanceStatus, ProcessInstance, Token, TokenState};
