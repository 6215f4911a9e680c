use std::collections::{HashMap, HashSet};

use crate::error::GraphError;
use crate::flow::types::{NodeKind, ProcessDefinition};
use crate::utils::ConfigValidator;

/// 校验流程定义的结构不变量
///
/// 检查顺序：标识符与唯一性、顺序流引用、起止节点、出口数量、
/// 可达性，最后是环检测。
pub fn validate(definition: &ProcessDefinition) -> Result<(), GraphError> {
    ConfigValidator::validate_definition_key(&definition.key)?;

    let mut ids = HashSet::new();
    for node in &definition.nodes {
        ConfigValidator::validate_node_id(&node.id)?;
        if !ids.insert(node.id.as_str()) {
            return Err(GraphError::DuplicateNode(node.id.clone()));
        }
        if let NodeKind::UserTask { candidate_group } = &node.kind {
            ConfigValidator::validate_candidate_group(candidate_group)
                .map_err(|_| GraphError::MissingCandidateGroup(node.id.clone()))?;
        }
    }

    let mut flow_ids = HashSet::new();
    for flow in &definition.flows {
        if !flow_ids.insert(flow.id.as_str()) {
            return Err(GraphError::DuplicateFlow(flow.id.clone()));
        }
        for endpoint in [&flow.source, &flow.target] {
            if !ids.contains(endpoint.as_str()) {
                return Err(GraphError::UnknownNode {
                    flow: flow.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
    }

    let starts: Vec<String> = definition
        .nodes
        .iter()
        .filter(|node| matches!(node.kind, NodeKind::Start))
        .map(|node| node.id.clone())
        .collect();
    let start = match starts.as_slice() {
        [] => return Err(GraphError::MissingStart),
        [start] => start.clone(),
        _ => return Err(GraphError::MultipleStarts(starts)),
    };
    if !definition.incoming(&start).is_empty() {
        return Err(GraphError::StartHasIncoming(start));
    }

    if definition.end_nodes().next().is_none() {
        return Err(GraphError::MissingEnd);
    }

    for node in &definition.nodes {
        let outgoing = definition.outgoing(&node.id).len();
        match (&node.kind, outgoing) {
            (NodeKind::End, 0) => {}
            (NodeKind::End, _) => return Err(GraphError::EndHasOutgoing(node.id.clone())),
            (_, 0) => return Err(GraphError::DeadEnd(node.id.clone())),
            (NodeKind::ExclusiveGateway, _) | (_, 1) => {}
            _ => return Err(GraphError::AmbiguousBranch(node.id.clone())),
        }
    }

    let adjacency = adjacency(definition);
    let reachable = reachable_from(&adjacency, &start);
    if let Some(node) = definition
        .nodes
        .iter()
        .find(|node| !reachable.contains(node.id.as_str()))
    {
        return Err(GraphError::Unreachable(node.id.clone()));
    }

    if let Some(node) = find_cycle(&adjacency, &start) {
        return Err(GraphError::Cycle(node));
    }

    Ok(())
}

fn adjacency(definition: &ProcessDefinition) -> HashMap<&str, Vec<&str>> {
    let mut adjacency: HashMap<&str, Vec<&str>> = definition
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), Vec::new()))
        .collect();
    for flow in &definition.flows {
        adjacency
            .entry(flow.source.as_str())
            .or_default()
            .push(flow.target.as_str());
    }
    adjacency
}

fn reachable_from<'a>(adjacency: &HashMap<&'a str, Vec<&'a str>>, start: &'a str) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        if let Some(next) = adjacency.get(node) {
            stack.extend(next.iter().copied());
        }
    }
    seen
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// 深度优先搜索回边；返回环上的一个节点
fn find_cycle(adjacency: &HashMap<&str, Vec<&str>>, start: &str) -> Option<String> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
    marks.insert(start, Mark::Visiting);

    while let Some((node, index)) = stack.last().copied() {
        let successors = adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]);
        match successors.get(index) {
            Some(&next) => {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                match marks.get(next) {
                    Some(Mark::Visiting) => return Some(next.to_string()),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::Visiting);
                        stack.push((next, 0));
                    }
                }
            }
            None => {
                marks.insert(node, Mark::Done);
                stack.pop();
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::types::{Node, SequenceFlow};

    fn node(id: &str, kind: NodeKind) -> Node {
        Node::new(id, kind)
    }

    fn task(id: &str) -> Node {
        node(
            id,
            NodeKind::UserTask {
                candidate_group: "managers".into(),
            },
        )
    }

    fn definition(nodes: Vec<Node>, flows: Vec<(&str, &str)>) -> ProcessDefinition {
        ProcessDefinition {
            key: "test".into(),
            name: None,
            nodes,
            flows: flows
                .into_iter()
                .enumerate()
                .map(|(i, (from, to))| SequenceFlow::new(format!("f{i}"), from, to))
                .collect(),
        }
    }

    #[test]
    fn accepts_linear_process() {
        let def = definition(
            vec![
                node("start", NodeKind::Start),
                task("approve"),
                node("end", NodeKind::End),
            ],
            vec![("start", "approve"), ("approve", "end")],
        );
        assert_eq!(validate(&def), Ok(()));
    }

    #[test]
    fn rejects_missing_start_and_end() {
        let no_start = definition(
            vec![task("approve"), node("end", NodeKind::End)],
            vec![("approve", "end")],
        );
        assert_eq!(validate(&no_start), Err(GraphError::MissingStart));

        let no_end = definition(
            vec![node("start", NodeKind::Start), task("approve")],
            vec![("start", "approve")],
        );
        assert_eq!(validate(&no_end), Err(GraphError::MissingEnd));
    }

    #[test]
    fn rejects_multiple_starts() {
        let def = definition(
            vec![
                node("a", NodeKind::Start),
                node("b", NodeKind::Start),
                node("end", NodeKind::End),
            ],
            vec![("a", "end"), ("b", "end")],
        );
        assert!(matches!(validate(&def), Err(GraphError::MultipleStarts(_))));
    }

    #[test]
    fn rejects_unreachable_node() {
        let def = definition(
            vec![
                node("start", NodeKind::Start),
                task("orphan"),
                node("end", NodeKind::End),
            ],
            vec![("start", "end"), ("orphan", "end")],
        );
        assert_eq!(
            validate(&def),
            Err(GraphError::Unreachable("orphan".into()))
        );
    }

    #[test]
    fn rejects_branching_outside_gateway() {
        let def = definition(
            vec![
                node("start", NodeKind::Start),
                task("approve"),
                node("yes", NodeKind::End),
                node("no", NodeKind::End),
            ],
            vec![("start", "approve"), ("approve", "yes"), ("approve", "no")],
        );
        assert_eq!(
            validate(&def),
            Err(GraphError::AmbiguousBranch("approve".into()))
        );
    }

    #[test]
    fn rejects_cycles_and_dead_ends() {
        let cyclic = definition(
            vec![
                node("start", NodeKind::Start),
                task("a"),
                node("gw", NodeKind::ExclusiveGateway),
                node("end", NodeKind::End),
            ],
            vec![("start", "a"), ("a", "gw"), ("gw", "a"), ("gw", "end")],
        );
        assert_eq!(validate(&cyclic), Err(GraphError::Cycle("a".into())));

        let dead_end = definition(
            vec![
                node("start", NodeKind::Start),
                task("a"),
                node("end", NodeKind::End),
            ],
            vec![("start", "a")],
        );
        assert_eq!(validate(&dead_end), Err(GraphError::DeadEnd("a".into())));
    }

    #[test]
    fn rejects_unknown_flow_endpoints_and_empty_groups() {
        let dangling = definition(
            vec![node("start", NodeKind::Start), node("end", NodeKind::End)],
            vec![("start", "nowhere")],
        );
        assert!(matches!(
            validate(&dangling),
            Err(GraphError::UnknownNode { .. })
        ));

        let no_group = definition(
            vec![
                node("start", NodeKind::Start),
                node(
                    "approve",
                    NodeKind::UserTask {
                        candidate_group: String::new(),
                    },
                ),
                node("end", NodeKind::End),
            ],
            vec![("start", "approve"), ("approve", "end")],
        );
        assert_eq!(
            validate(&no_group),
            Err(GraphError::MissingCandidateGroup("approve".into()))
        );
    }
}
