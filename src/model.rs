pub(crate) mod validate;

use crate::error::ValidationError;
use std::fmt::Display;

/// What a [`FlowNode`] is, and what the engine does when a token reaches it.
///
/// Start and end events are automatic: a token passes straight through. A
/// user task holds the token until the task is completed through the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Start,
    UserTask {
        name: String,
        assignee: Option<String>,
    },
    End,
}

impl NodeKind {
    pub fn is_start(&self) -> bool {
        matches!(self, NodeKind::Start)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, NodeKind::End)
    }

    pub fn is_user_task(&self) -> bool {
        matches!(self, NodeKind::UserTask { .. })
    }
}

/// A node in a process graph. The id is unique within its definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowNode {
    pub id: String,
    pub kind: NodeKind,
}

impl Display for FlowNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            NodeKind::UserTask { name, .. } => write!(f, "userTask {} ({name})", self.id),
            NodeKind::Start => write!(f, "startEvent {}", self.id),
            NodeKind::End => write!(f, "endEvent {}", self.id),
        }
    }
}

/// A directed edge between two nodes of the same process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceFlow {
    pub source: String,
    pub target: String,
}

/// A validated, immutable workflow graph template.
///
/// Built with [`ProcessDefinition::builder`], which rejects malformed graphs,
/// or read back from XML with [`crate::xml::read_definition`]. The version is
/// `0` until the definition is deployed; the store stamps the real version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDefinition {
    id: String,
    version: u32,
    nodes: Vec<FlowNode>,
    flows: Vec<SequenceFlow>,
    start: usize,
    outgoing: Vec<Vec<usize>>,
}

impl ProcessDefinition {
    pub fn builder(id: impl Into<String>) -> ProcessDefinitionBuilder {
        ProcessDefinitionBuilder {
            id: id.into(),
            nodes: Vec::new(),
            flows: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Deployed version, `0` for an undeployed definition.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn flows(&self) -> &[SequenceFlow] {
        &self.flows
    }

    pub(crate) fn start(&self) -> usize {
        self.start
    }

    pub(crate) fn node(&self, index: usize) -> Option<&FlowNode> {
        self.nodes.get(index)
    }

    pub(crate) fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    /// Indexes of the nodes directly downstream of `index`.
    pub(crate) fn outgoing(&self, index: usize) -> &[usize] {
        self.outgoing.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}

/// Collects nodes and flows, then validates the whole graph in
/// [`build`](Self::build). No partially constructed definition escapes.
#[derive(Debug)]
pub struct ProcessDefinitionBuilder {
    id: String,
    nodes: Vec<FlowNode>,
    flows: Vec<SequenceFlow>,
}

impl ProcessDefinitionBuilder {
    pub fn start_event(self, id: impl Into<String>) -> Self {
        self.node(id, NodeKind::Start)
    }

    pub fn user_task(
        self,
        id: impl Into<String>,
        name: impl Into<String>,
        assignee: Option<&str>,
    ) -> Self {
        self.node(
            id,
            NodeKind::UserTask {
                name: name.into(),
                assignee: assignee.map(str::to_owned),
            },
        )
    }

    pub fn end_event(self, id: impl Into<String>) -> Self {
        self.node(id, NodeKind::End)
    }

    pub fn node(mut self, id: impl Into<String>, kind: NodeKind) -> Self {
        self.nodes.push(FlowNode { id: id.into(), kind });
        self
    }

    pub fn flow(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.flows.push(SequenceFlow {
            source: source.into(),
            target: target.into(),
        });
        self
    }

    /// Validate the collected graph and release the immutable definition.
    pub fn build(self) -> Result<ProcessDefinition, ValidationError> {
        let resolved = validate::validate(&self.nodes, &self.flows)?;
        Ok(ProcessDefinition {
            id: self.id,
            version: 0,
            nodes: self.nodes,
            flows: self.flows,
            start: resolved.start,
            outgoing: resolved.outgoing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_task_process() -> ProcessDefinition {
        ProcessDefinition::builder("my-process")
            .start_event("start")
            .user_task("task1", "First task", Some("fred"))
            .user_task("task2", "Second task", Some("john"))
            .end_event("end")
            .flow("start", "task1")
            .flow("task1", "task2")
            .flow("task2", "end")
            .build()
            .unwrap()
    }

    #[test]
    fn builder_produces_resolved_graph() {
        let definition = two_task_process();
        assert_eq!(definition.id(), "my-process");
        assert_eq!(definition.version(), 0);
        assert_eq!(definition.nodes().len(), 4);
        assert_eq!(definition.flows().len(), 3);

        let start = definition.start();
        assert!(definition.node(start).unwrap().kind.is_start());
        let [task1] = definition.outgoing(start) else {
            panic!("start should have one outgoing flow");
        };
        assert_eq!(definition.node(*task1).unwrap().id, "task1");
    }

    #[test]
    fn node_lookup_by_id() {
        let definition = two_task_process();
        let index = definition.node_index("task2").unwrap();
        let node = definition.node(index).unwrap();
        assert!(node.kind.is_user_task());
        assert_eq!(node.to_string(), "userTask task2 (Second task)");
    }
}
