//! Pure structural validation of a process graph. No side effects; the
//! builder runs this before a [`ProcessDefinition`](super::ProcessDefinition)
//! exists, and the store runs it again on deploy.

use crate::error::ValidationError;
use crate::model::{FlowNode, SequenceFlow};
use std::collections::HashMap;

/// Adjacency resolved during validation, kept on the definition so the
/// engine never re-walks string ids.
pub(crate) struct Resolved {
    pub(crate) start: usize,
    pub(crate) outgoing: Vec<Vec<usize>>,
}

pub(crate) fn validate(
    nodes: &[FlowNode],
    flows: &[SequenceFlow],
) -> Result<Resolved, ValidationError> {
    let mut index = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if index.insert(node.id.as_str(), i).is_some() {
            return Err(ValidationError::DuplicateId(node.id.clone()));
        }
    }

    let mut outgoing = vec![Vec::new(); nodes.len()];
    for flow in flows {
        let (Some(&source), Some(&target)) =
            (index.get(flow.source.as_str()), index.get(flow.target.as_str()))
        else {
            return Err(ValidationError::DanglingEdge {
                source_id: flow.source.clone(),
                target: flow.target.clone(),
            });
        };
        outgoing[source].push(target);
    }

    let mut starts = nodes.iter().enumerate().filter(|(_, node)| node.kind.is_start());
    let Some((start, _)) = starts.next() else {
        return Err(ValidationError::MissingStartNode);
    };
    if starts.next().is_some() {
        return Err(ValidationError::MultipleStartNodes);
    }

    if !nodes.iter().any(|node| node.kind.is_end()) {
        return Err(ValidationError::MissingEndNode);
    }

    for (i, node) in nodes.iter().enumerate() {
        if outgoing[i].is_empty() && !node.kind.is_end() {
            return Err(ValidationError::DeadEnd(node.id.clone()));
        }
    }

    // Reachability doubles as the orphan and incoming-edge check: a non-start
    // node with no incoming flow is never visited by the walk.
    walk(start, nodes, &outgoing)?;

    Ok(Resolved { start, outgoing })
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

// Depth-first from the start event. Finds back edges (cyclic flows are not
// supported, advancement must be bounded by graph size) and marks what is
// reachable.
fn walk(
    start: usize,
    nodes: &[FlowNode],
    outgoing: &[Vec<usize>],
) -> Result<(), ValidationError> {
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    visit(start, nodes, outgoing, &mut marks)?;

    if let Some((_, node)) = nodes
        .iter()
        .enumerate()
        .find(|(i, _)| marks[*i] == Mark::Unvisited)
    {
        return Err(ValidationError::UnreachableNode(node.id.clone()));
    }
    Ok(())
}

fn visit(
    current: usize,
    nodes: &[FlowNode],
    outgoing: &[Vec<usize>],
    marks: &mut [Mark],
) -> Result<(), ValidationError> {
    match marks[current] {
        Mark::Done => return Ok(()),
        Mark::InProgress => return Err(ValidationError::CyclicFlow(nodes[current].id.clone())),
        Mark::Unvisited => {}
    }
    marks[current] = Mark::InProgress;
    for &next in &outgoing[current] {
        visit(next, nodes, outgoing, marks)?;
    }
    marks[current] = Mark::Done;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProcessDefinition;

    fn build(
        f: impl FnOnce(crate::model::ProcessDefinitionBuilder) -> crate::model::ProcessDefinitionBuilder,
    ) -> Result<ProcessDefinition, ValidationError> {
        f(ProcessDefinition::builder("p")).build()
    }

    #[test]
    fn no_start_event() {
        let err = build(|b| b.user_task("t", "T", None).end_event("end").flow("t", "end"));
        assert_eq!(err.unwrap_err(), ValidationError::MissingStartNode);
    }

    #[test]
    fn two_start_events() {
        let err = build(|b| {
            b.start_event("s1")
                .start_event("s2")
                .end_event("end")
                .flow("s1", "end")
                .flow("s2", "end")
        });
        assert_eq!(err.unwrap_err(), ValidationError::MultipleStartNodes);
    }

    #[test]
    fn no_end_event() {
        let err = build(|b| b.start_event("s").user_task("t", "T", None).flow("s", "t"));
        assert_eq!(err.unwrap_err(), ValidationError::MissingEndNode);
    }

    #[test]
    fn duplicate_node_id() {
        let err = build(|b| {
            b.start_event("s")
                .user_task("x", "A", None)
                .user_task("x", "B", None)
                .end_event("end")
        });
        assert_eq!(err.unwrap_err(), ValidationError::DuplicateId("x".into()));
    }

    #[test]
    fn dangling_edge() {
        let err = build(|b| b.start_event("s").end_event("end").flow("s", "ghost"));
        assert_eq!(
            err.unwrap_err(),
            ValidationError::DanglingEdge {
                source_id: "s".into(),
                target: "ghost".into()
            }
        );
    }

    #[test]
    fn orphan_node() {
        let err = build(|b| {
            b.start_event("s")
                .user_task("island", "Island", None)
                .end_event("end")
                .flow("s", "end")
                .flow("island", "end")
        });
        assert_eq!(err.unwrap_err(), ValidationError::UnreachableNode("island".into()));
    }

    #[test]
    fn dead_end_task() {
        let err = build(|b| {
            b.start_event("s")
                .user_task("t", "T", None)
                .end_event("end")
                .flow("s", "t")
                .flow("s", "end")
        });
        assert_eq!(err.unwrap_err(), ValidationError::DeadEnd("t".into()));
    }

    #[test]
    fn cyclic_flow() {
        let err = build(|b| {
            b.start_event("s")
                .user_task("a", "A", None)
                .user_task("b", "B", None)
                .end_event("end")
                .flow("s", "a")
                .flow("a", "b")
                .flow("b", "a")
                .flow("b", "end")
        });
        assert!(matches!(err.unwrap_err(), ValidationError::CyclicFlow(_)));
    }

    #[test]
    fn minimal_valid_graph() {
        let definition = build(|b| b.start_event("s").end_event("end").flow("s", "end")).unwrap();
        assert_eq!(definition.outgoing(definition.start()).len(), 1);
    }
}
