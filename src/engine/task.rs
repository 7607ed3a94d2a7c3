use crate::engine::InstanceId;
use std::fmt::Display;

pub type TaskId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Active,
    Completed,
}

/// A unit of human work, created when a token reaches a user task node and
/// completed through [`Engine::complete_task`](crate::Engine::complete_task).
#[derive(Debug, Clone)]
pub struct TaskInstance {
    pub(super) id: TaskId,
    pub(super) instance: InstanceId,
    pub(super) node_id: String,
    pub(super) name: String,
    pub(super) assignee: Option<String>,
    pub(super) state: TaskState,
}

impl TaskInstance {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The process instance this task belongs to.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Id of the user task node this task instantiates.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current assignee. Seeded from the definition, changed by
    /// [`Engine::reassign_task`](crate::Engine::reassign_task).
    pub fn assignee(&self) -> Option<&str> {
        self.assignee.as_deref()
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TaskState::Active
    }
}

impl Display for TaskInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "task {} \"{}\" ({})",
            self.id,
            self.name,
            self.assignee.as_deref().unwrap_or("unassigned")
        )
    }
}
