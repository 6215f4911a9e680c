use crate::error::Result;
use crate::flow::conditions::Condition;
use crate::flow::types::{Node, NodeKind, ProcessDefinition, SequenceFlow};
use crate::flow::validate::validate;

/// 流程定义构建器
pub struct ProcessBuilder {
    key: String,
    name: Option<String>,
    nodes: Vec<Node>,
    flows: Vec<SequenceFlow>,
}

impl ProcessBuilder {
    pub fn new<T: Into<String>>(key: T) -> Self {
        Self {
            key: key.into(),
            name: None,
            nodes: Vec::new(),
            flows: Vec::new(),
        }
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn add_start(&mut self, id: &str) -> &mut Self {
        self.add_node(Node::new(id, NodeKind::Start))
    }

    pub fn add_user_task(&mut self, id: &str, candidate_group: &str) -> &mut Self {
        self.add_node(Node::new(
            id,
            NodeKind::UserTask {
                candidate_group: candidate_group.to_string(),
            },
        ))
    }

    pub fn add_named_user_task(&mut self, id: &str, name: &str, candidate_group: &str) -> &mut Self {
        self.add_node(
            Node::new(
                id,
                NodeKind::UserTask {
                    candidate_group: candidate_group.to_string(),
                },
            )
            .with_name(name),
        )
    }

    pub fn add_gateway(&mut self, id: &str) -> &mut Self {
        self.add_node(Node::new(id, NodeKind::ExclusiveGateway))
    }

    pub fn add_end(&mut self, id: &str) -> &mut Self {
        self.add_node(Node::new(id, NodeKind::End))
    }

    pub fn connect(&mut self, from: &str, to: &str) -> &mut Self {
        self.push_flow(from, to, None, None)
    }

    pub fn connect_named(&mut self, from: &str, to: &str, name: &str) -> &mut Self {
        self.push_flow(from, to, Some(name.to_string()), None)
    }

    pub fn connect_if(&mut self, from: &str, to: &str, condition: Condition) -> &mut Self {
        self.push_flow(from, to, None, Some(condition))
    }

    /// 以表达式字符串连接，表达式非法时返回错误
    pub fn connect_expr(&mut self, from: &str, to: &str, expression: &str) -> Result<&mut Self> {
        let condition = Condition::parse(expression)?;
        Ok(self.push_flow(from, to, None, Some(condition)))
    }

    fn push_flow(
        &mut self,
        from: &str,
        to: &str,
        name: Option<String>,
        condition: Option<Condition>,
    ) -> &mut Self {
        let id = format!("flow_{}", self.flows.len() + 1);
        self.flows.push(SequenceFlow {
            id,
            source: from.to_string(),
            target: to.to_string(),
            condition,
            name,
        });
        self
    }

    /// 构建并校验
    pub fn build(&self) -> Result<ProcessDefinition> {
        let definition = ProcessDefinition {
            key: self.key.clone(),
            name: self.name.clone(),
            nodes: self.nodes.clone(),
            flows: self.flows.clone(),
        };
        validate(&definition)?;
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FlowError, GraphError};

    #[test]
    fn builder_preserves_flow_declaration_order() {
        let mut builder = ProcessBuilder::new("holidayRequest");
        builder
            .add_start("start")
            .add_user_task("approveTask", "managers")
            .add_gateway("decision")
            .add_end("approveEnd")
            .add_end("rejectEnd")
            .connect("start", "approveTask")
            .connect("approveTask", "decision")
            .connect_if("decision", "approveEnd", Condition::is_true("approved"))
            .connect_named("decision", "rejectEnd", "otherwise");

        let definition = builder.build().unwrap();
        let targets: Vec<_> = definition
            .outgoing("decision")
            .iter()
            .map(|flow| flow.target.as_str())
            .collect();
        assert_eq!(targets, vec!["approveEnd", "rejectEnd"]);
        assert_eq!(definition.flows[3].name.as_deref(), Some("otherwise"));
    }

    #[test]
    fn build_reports_graph_errors() {
        let mut builder = ProcessBuilder::new("broken");
        builder.add_start("start");
        let err = builder.build().unwrap_err();
        assert!(matches!(err, FlowError::Graph(GraphError::MissingEnd)));
    }

    #[test]
    fn connect_expr_rejects_bad_expression() {
        let mut builder = ProcessBuilder::new("expr");
        builder.add_gateway("gw").add_end("end");
        assert!(builder.connect_expr("gw", "end", "approved ==").is_err());
        assert!(builder.connect_expr("gw", "end", "${approved}").is_ok());
    }
}
