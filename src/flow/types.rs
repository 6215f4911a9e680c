use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::flow::conditions::Condition;
use crate::state::VariableScope;

/// 流程定义
///
/// 不可变的有向图。节点与顺序流都以声明顺序保存在 `Vec` 中，
/// 网关按声明顺序求值。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub flows: Vec<SequenceFlow>,
}

impl ProcessDefinition {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }

    /// 起始节点；未校验的定义可能没有
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|node| matches!(node.kind, NodeKind::Start))
    }

    pub fn end_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|node| matches!(node.kind, NodeKind::End))
    }

    /// 从指定节点出发的顺序流，保持声明顺序
    pub fn outgoing(&self, node_id: &str) -> Vec<&SequenceFlow> {
        self.flows.iter().filter(|f| f.source == node_id).collect()
    }

    pub fn incoming(&self, node_id: &str) -> Vec<&SequenceFlow> {
        self.flows.iter().filter(|f| f.target == node_id).collect()
    }

    /// 计算令牌离开 `node_id` 后的下一个节点
    ///
    /// 单一出口直接取其目标（带条件且条件不成立时视为无匹配）。
    /// 排他网关先按声明顺序求值带条件的顺序流，首个成立者胜出；
    /// 都不成立时退回第一条无条件的默认流。
    pub fn resolve_next(
        &self,
        instance_id: &str,
        node_id: &str,
        scope: &VariableScope,
    ) -> Result<&Node> {
        let node = self
            .node(node_id)
            .ok_or_else(|| FlowError::Other(anyhow::anyhow!("unknown node `{node_id}`")))?;
        let outgoing = self.outgoing(node_id);

        let chosen = match node.kind {
            NodeKind::ExclusiveGateway => outgoing
                .iter()
                .find(|flow| {
                    flow.condition
                        .as_ref()
                        .is_some_and(|condition| condition.evaluate(scope))
                })
                .or_else(|| outgoing.iter().find(|flow| flow.condition.is_none())),
            _ => outgoing.first().filter(|flow| {
                flow.condition
                    .as_ref()
                    .map_or(true, |condition| condition.evaluate(scope))
            }),
        };

        let flow = chosen.ok_or_else(|| FlowError::NoMatchingFlow {
            instance_id: instance_id.to_string(),
            gateway: node_id.to_string(),
        })?;

        tracing::trace!(
            from = %node_id,
            to = %flow.target,
            flow = %flow.id,
            "sequence flow selected"
        );

        self.node(&flow.target).ok_or_else(|| {
            FlowError::Other(anyhow::anyhow!(
                "sequence flow `{}` targets unknown node `{}`",
                flow.id,
                flow.target
            ))
        })
    }
}

/// 流程节点
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn candidate_group(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::UserTask { candidate_group } => Some(candidate_group),
            _ => None,
        }
    }
}

/// 节点类型
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    UserTask { candidate_group: String },
    ExclusiveGateway,
    End,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::UserTask { .. } => "user_task",
            NodeKind::ExclusiveGateway => "exclusive_gateway",
            NodeKind::End => "end",
        }
    }
}

/// 顺序流
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SequenceFlow {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::flow::conditions::deserialize_optional"
    )]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SequenceFlow {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            condition: None,
            name: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
