pub mod config;
pub mod error;
pub mod flow;
pub mod history;
pub mod runtime;
pub mod state;
pub mod tasks;
pub mod utils;

pub use config::{EngineConfig, EnvConfig};
pub use error::{FlowError, GraphError, Result};
pub use flow::{
    validate, Condition, DefinitionRegistry, Node, NodeKind, ProcessBuilder, ProcessDefinition,
    SequenceFlow,
};
pub use history::{ActivitySummary, HistoryLog, HistoryRecord};
pub use runtime::{InstanceStatus, ProcessEngine, ProcessInstance, Token, TokenState};
pub use state::{MemoryStore, ProcessStore, VariableScope, VariableValue, Variables};
pub use tasks::{TaskInstance, TaskRegistry, TaskStatus, TaskSummary};
pub use utils::{logging, validation};
