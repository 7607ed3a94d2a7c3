//! # Virvel
//!
//! `Virvel` is a small embeddable workflow engine for the sequential subset
//! of BPMN: a start event, a chain of user tasks and an end event. Build a
//! process graph in code, deploy it to a versioned in-memory store, start
//! instances and drive them by completing tasks.
//!
//! - Definitions are validated before they exist: the builder rejects
//!   malformed graphs, so the engine never meets one.
//! - Deployments are append-only and versioned per process id; running
//!   instances stay pinned to the version they started with.
//! - Tokens advance automatically across events and pause at user tasks
//!   until completed through the engine.
//! - Definitions round-trip through a BPMN-flavoured XML interchange format
//!   and render to SVG diagrams for export.
//! - Contains no database.
//!
//! This is not an implementation of the BPMN 2.0 specification; gateways,
//! parallel tokens, loops and timers are out of scope by design.
//!
//! ## Example
//!
//! ### Cargo.toml
//! ```toml
//! [dependencies]
//! virvel = "0.3"
//! log = "0.4"
//! pretty_env_logger = "0.5"
//! ```
//! ### main.rs
//!
//! ```
//! use std::sync::Arc;
//! use virvel::{DeploymentStore, Engine, ProcessDefinition};
//!
//! extern crate pretty_env_logger;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     pretty_env_logger::init();
//!
//!     let definition = ProcessDefinition::builder("my-process")
//!         .start_event("start")
//!         .user_task("task1", "First task", Some("fred"))
//!         .user_task("task2", "Second task", Some("john"))
//!         .end_event("end")
//!         .flow("start", "task1")
//!         .flow("task1", "task2")
//!         .flow("task2", "end")
//!         .build()?;
//!
//!     let engine = Engine::new(Arc::new(DeploymentStore::new()));
//!     engine.deploy("Dynamic process deployment", vec![definition])?;
//!
//!     let instance = engine.start("my-process")?;
//!     while let Some(task) = engine.active_tasks(instance.id())?.first() {
//!         println!("completing {} for {:?}", task.name(), task.assignee());
//!         engine.complete_task(task.id())?;
//!     }
//!
//!     assert!(engine.instance(instance.id())?.is_terminal());
//!     Ok(())
//! }
//! ```

mod diagram;
mod engine;
mod error;
mod model;
mod store;
mod xml;

pub use diagram::render_svg;
pub use engine::{Engine, InstanceId, ProcessInstance, TaskId, TaskInstance, TaskState};
pub use error::{Error, Result, ValidationError};
pub use model::{FlowNode, NodeKind, ProcessDefinition, ProcessDefinitionBuilder, SequenceFlow};
pub use store::{Deployment, DeploymentId, DeploymentStore};
pub use xml::{read_definition, write_definition};
