mod task;

pub use task::{TaskId, TaskInstance, TaskState};

use crate::error::{Error, Result};
use crate::model::{NodeKind, ProcessDefinition};
use crate::store::{Deployment, DeploymentStore};
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};
use std::time::SystemTime;

pub type InstanceId = u64;

/// A running execution of a deployed definition.
///
/// This is a snapshot: the engine owns the live state and hands out clones.
/// The definition reference is pinned to the version that was latest when the
/// instance started, so later deployments never affect running instances.
#[derive(Debug, Clone)]
pub struct ProcessInstance {
    id: InstanceId,
    definition: Arc<ProcessDefinition>,
    active: Vec<usize>,
    started_at: SystemTime,
    terminal: bool,
}

impl ProcessInstance {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn definition(&self) -> &Arc<ProcessDefinition> {
        &self.definition
    }

    pub fn process_id(&self) -> &str {
        self.definition.id()
    }

    pub fn version(&self) -> u32 {
        self.definition.version()
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// True once a token has been consumed at an end event and no other
    /// token remains.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Ids of the nodes currently holding a token.
    pub fn active_node_ids(&self) -> Vec<&str> {
        self.active
            .iter()
            .filter_map(|&index| self.definition.node(index))
            .map(|node| node.id.as_str())
            .collect()
    }
}

// Live state behind the per-instance lock. Tasks stay in creation order and
// are never removed, completed ones are just filtered out of listings.
struct InstanceState {
    instance: ProcessInstance,
    tasks: Vec<TaskInstance>,
}

/// The execution engine and task service.
///
/// Holds an explicit store handle instead of any ambient engine context.
/// Every instance is guarded by its own lock: mutations take it with
/// `try_lock`, so two concurrent completions of the same instance surface as
/// [`Error::ConcurrentModification`] instead of double-advancing a token.
pub struct Engine {
    store: Arc<DeploymentStore>,
    instances: RwLock<HashMap<InstanceId, Arc<Mutex<InstanceState>>>>,
    task_owner: RwLock<HashMap<TaskId, InstanceId>>,
    instance_seq: AtomicU64,
    task_seq: AtomicU64,
}

impl Engine {
    pub fn new(store: Arc<DeploymentStore>) -> Self {
        Self {
            store,
            instances: RwLock::new(HashMap::new()),
            task_owner: RwLock::new(HashMap::new()),
            instance_seq: AtomicU64::new(0),
            task_seq: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &DeploymentStore {
        &self.store
    }

    /// Deploy definitions through the engine's store handle.
    pub fn deploy(
        &self,
        name: impl Into<String>,
        definitions: Vec<ProcessDefinition>,
    ) -> Result<Arc<Deployment>> {
        self.store.deploy(name, definitions)
    }

    /// Start an instance of the latest deployed version of `process_id`.
    ///
    /// The initial token advances automatically until it reaches a user task
    /// or an end event; with no user task on the way the returned instance is
    /// already terminal.
    pub fn start(&self, process_id: &str) -> Result<ProcessInstance> {
        let definition = self.store.latest(process_id)?;
        let id = self.instance_seq.fetch_add(1, Ordering::Relaxed) + 1;

        let mut state = InstanceState {
            instance: ProcessInstance {
                id,
                active: vec![definition.start()],
                started_at: SystemTime::now(),
                terminal: false,
                definition,
            },
            tasks: Vec::new(),
        };
        debug!(
            "instance {id} started for process \"{}\" v{}",
            state.instance.process_id(),
            state.instance.version()
        );
        let start = state.instance.definition.start();
        self.advance(&mut state, start)?;

        let snapshot = state.instance.clone();
        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(state)));
        Ok(snapshot)
    }

    /// Snapshot of a running or finished instance.
    pub fn instance(&self, instance_id: InstanceId) -> Result<ProcessInstance> {
        let state = self.state(instance_id)?;
        let guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.instance.clone())
    }

    /// Active tasks of an instance, in creation order.
    pub fn active_tasks(&self, instance_id: InstanceId) -> Result<Vec<TaskInstance>> {
        let state = self.state(instance_id)?;
        let guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .tasks
            .iter()
            .filter(|task| task.is_active())
            .cloned()
            .collect())
    }

    /// Complete an active task and advance the token it was holding.
    pub fn complete_task(&self, task_id: TaskId) -> Result<()> {
        self.with_task(task_id, |engine, state, index| {
            engine.finish_task(state, index)
        })
    }

    /// Claim and complete in one serialized step.
    pub fn complete_task_as(&self, task_id: TaskId, assignee: &str) -> Result<()> {
        self.with_task(task_id, |engine, state, index| {
            state.tasks[index].assignee = Some(assignee.to_owned());
            engine.finish_task(state, index)
        })
    }

    /// Change the assignee of an active task. No advancement.
    pub fn reassign_task(&self, task_id: TaskId, assignee: &str) -> Result<()> {
        self.with_task(task_id, |_, state, index| {
            let task = &mut state.tasks[index];
            debug!("{task} reassigned to {assignee}");
            task.assignee = Some(assignee.to_owned());
            Ok(())
        })
    }

    fn state(&self, instance_id: InstanceId) -> Result<Arc<Mutex<InstanceState>>> {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&instance_id)
            .cloned()
            .ok_or(Error::InstanceNotFound(instance_id))
    }

    // Resolve the task, take its instance lock without blocking and run the
    // mutation against the live state.
    fn with_task(
        &self,
        task_id: TaskId,
        f: impl FnOnce(&Self, &mut InstanceState, usize) -> Result<()>,
    ) -> Result<()> {
        let instance_id = *self
            .task_owner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&task_id)
            .ok_or(Error::TaskNotFound(task_id))?;
        let state = self.state(instance_id)?;
        let mut guard = match state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                return Err(Error::ConcurrentModification(instance_id));
            }
        };

        let index = guard
            .tasks
            .iter()
            .position(|task| task.id == task_id && task.is_active())
            .ok_or(Error::TaskNotFound(task_id))?;
        f(self, &mut *guard, index)
    }

    fn finish_task(&self, state: &mut InstanceState, index: usize) -> Result<()> {
        let node = state
            .instance
            .definition
            .node_index(&state.tasks[index].node_id)
            .ok_or_else(|| Error::Definition("task node missing from definition".into()))?;
        // Fail before any mutation: with an unsupported fan-out the task must
        // stay active.
        single_outgoing(&state.instance.definition, node)?;

        let task = &mut state.tasks[index];
        task.state = TaskState::Completed;
        debug!("{task} completed");
        self.advance(state, node)
    }

    // Move the token sitting at `from` along the single outgoing flow,
    // passing straight through automatic nodes, until it either parks at a
    // user task (emitting a task instance) or is consumed at an end event.
    fn advance(&self, state: &mut InstanceState, from: usize) -> Result<()> {
        let definition = Arc::clone(&state.instance.definition);
        let mut current = from;

        loop {
            let next = single_outgoing(&definition, current)?;
            state.instance.active.retain(|&index| index != current);

            let node = definition
                .node(next)
                .ok_or_else(|| Error::Definition("flow target missing".into()))?;
            match &node.kind {
                NodeKind::UserTask { name, assignee } => {
                    state.instance.active.push(next);
                    let task = TaskInstance {
                        id: self.task_seq.fetch_add(1, Ordering::Relaxed) + 1,
                        instance: state.instance.id,
                        node_id: node.id.clone(),
                        name: name.clone(),
                        assignee: assignee.clone(),
                        state: TaskState::Active,
                    };
                    debug!("instance {}: {task} activated", state.instance.id);
                    self.task_owner
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(task.id, state.instance.id);
                    state.tasks.push(task);
                    return Ok(());
                }
                NodeKind::End => {
                    if state.instance.active.is_empty() {
                        state.instance.terminal = true;
                        debug!("instance {} reached end \"{}\"", state.instance.id, node.id);
                    }
                    return Ok(());
                }
                NodeKind::Start => current = next,
            }
        }
    }
}

fn single_outgoing(definition: &ProcessDefinition, from: usize) -> Result<usize> {
    match definition.outgoing(from) {
        [next] => Ok(*next),
        outgoing => Err(Error::AmbiguousFlow {
            node: definition
                .node(from)
                .map(|node| node.id.clone())
                .unwrap_or_default(),
            count: outgoing.len(),
        }),
    }
}
