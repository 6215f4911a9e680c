use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{VariableScope, Variables};

// 运行时类型定义

/// 实例状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Active,
    Completed,
}

/// 令牌状态
///
/// `AtNode(start)` 为初始状态；推进后进入 `Blocked` 或 `Terminated`。
/// `Blocked` 只能由完成任务解除。`task_id` 为空表示推进失败后
/// 停留在网关之前的节点，等待排查。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TokenState {
    AtNode { node: String },
    Blocked { node: String, task_id: Option<String> },
    Terminated { end_node: String },
}

impl TokenState {
    pub fn node(&self) -> &str {
        match self {
            TokenState::AtNode { node } => node,
            TokenState::Blocked { node, .. } => node,
            TokenState::Terminated { end_node } => end_node,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, TokenState::Blocked { .. })
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, TokenState::Terminated { .. })
    }
}

/// 令牌
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub instance_id: String,
    pub state: TokenState,
}

/// 流程实例
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessInstance {
    pub id: String,
    pub definition_key: String,
    pub status: InstanceStatus,
    pub token: Token,
    pub variables: VariableScope,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// 最近一次推进失败的原因
    #[serde(default)]
    pub incident: Option<String>,
}

impl ProcessInstance {
    pub fn new(
        definition_key: impl Into<String>,
        start_node: impl Into<String>,
        variables: Variables,
        started_at: DateTime<Utc>,
    ) -> Self {
        let id = format!("inst-{}", uuid::Uuid::new_v4());
        Self {
            token: Token {
                instance_id: id.clone(),
                state: TokenState::AtNode {
                    node: start_node.into(),
                },
            },
            id,
            definition_key: definition_key.into(),
            status: InstanceStatus::Active,
            variables: VariableScope::from_variables(variables),
            started_at,
            ended_at: None,
            incident: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == InstanceStatus::Completed
    }
}
