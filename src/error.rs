use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlowError>;

/// 流程定义结构错误，只在部署/校验阶段出现
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("process definition key must not be empty")]
    EmptyKey,
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("duplicate node `{0}`")]
    DuplicateNode(String),
    #[error("duplicate sequence flow `{0}`")]
    DuplicateFlow(String),
    #[error("sequence flow `{flow}` references unknown node `{node}`")]
    UnknownNode { flow: String, node: String },
    #[error("process has no start node")]
    MissingStart,
    #[error("process has more than one start node: {0:?}")]
    MultipleStarts(Vec<String>),
    #[error("start node `{0}` has incoming sequence flows")]
    StartHasIncoming(String),
    #[error("process has no end node")]
    MissingEnd,
    #[error("end node `{0}` has outgoing sequence flows")]
    EndHasOutgoing(String),
    #[error("node `{0}` has no outgoing sequence flow")]
    DeadEnd(String),
    #[error("node `{0}` has several outgoing flows but is not an exclusive gateway")]
    AmbiguousBranch(String),
    #[error("user task `{0}` has no candidate group")]
    MissingCandidateGroup(String),
    #[error("node `{0}` is not reachable from the start node")]
    Unreachable(String),
    #[error("cycle detected through node `{0}`")]
    Cycle(String),
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("process definition `{0}` is not deployed")]
    UnknownDefinition(String),
    #[error("process instance `{0}` not found")]
    UnknownInstance(String),
    #[error("task `{0}` not found")]
    TaskNotFound(String),
    #[error("task `{0}` is already completed")]
    TaskAlreadyCompleted(String),
    #[error("no outgoing flow of `{gateway}` matched in instance `{instance_id}`")]
    NoMatchingFlow {
        instance_id: String,
        gateway: String,
    },
    #[error("maximum steps {0} exceeded")]
    MaxStepsExceeded(u32),
    #[error("invalid condition `{expression}`: {reason}")]
    InvalidCondition { expression: String, reason: String },
    #[error("store error: {0}")]
    Store(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlowError {
    /// 调用方错误：实例与任务状态保持不变
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            FlowError::UnknownDefinition(_)
                | FlowError::UnknownInstance(_)
                | FlowError::TaskNotFound(_)
                | FlowError::TaskAlreadyCompleted(_)
        )
    }
}
