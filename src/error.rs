use crate::engine::{InstanceId, TaskId};
use crate::store::DeploymentId;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the engine, store and serializer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A definition failed validation. Not retryable, fix the graph and redeploy.
    #[error("invalid definition: {0}")]
    Validation(#[from] ValidationError),

    #[error("no deployed definition for process \"{0}\"")]
    ProcessNotFound(String),

    #[error("unknown process instance {0}")]
    InstanceNotFound(InstanceId),

    /// Unknown or already completed task.
    #[error("unknown or completed task {0}")]
    TaskNotFound(TaskId),

    #[error("unknown deployment {0}")]
    DeploymentNotFound(DeploymentId),

    #[error("deployment {0} has no resource \"{1}\"")]
    ResourceNotFound(DeploymentId, String),

    /// A node has more than one outgoing sequence flow. Branching is outside
    /// the supported subset, so the definition cannot be advanced past it.
    #[error("node \"{node}\" has {count} outgoing sequence flows, expected one")]
    AmbiguousFlow { node: String, count: usize },

    /// Another caller is mutating the same instance. Safe to retry.
    #[error("instance {0} is being modified concurrently")]
    ConcurrentModification(InstanceId),

    /// Malformed definition document.
    #[error("malformed definition: {0}")]
    Definition(String),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Structural problems found in a process graph. Produced by
/// [`ProcessDefinitionBuilder::build`](crate::ProcessDefinitionBuilder::build)
/// and re-checked on deployment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("process has no start event")]
    MissingStartNode,

    #[error("process has more than one start event")]
    MultipleStartNodes,

    #[error("process has no end event")]
    MissingEndNode,

    #[error("node \"{0}\" is not reachable from the start event")]
    UnreachableNode(String),

    #[error("duplicate node id \"{0}\"")]
    DuplicateId(String),

    // The field cannot be named `source`: thiserror reserves that name for the
    // error's cause, and a String is not an Error.
    #[error("sequence flow \"{source_id}\" -> \"{target}\" references a nonexistent node")]
    DanglingEdge { source_id: String, target: String },

    #[error("node \"{0}\" has no outgoing sequence flow and is not an end event")]
    DeadEnd(String),

    #[error("cyclic flow through node \"{0}\"")]
    CyclicFlow(String),
}
