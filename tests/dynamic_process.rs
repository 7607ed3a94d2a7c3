//! End-to-end run of a dynamically built two-task process: build, deploy,
//! start, drive the tasks to completion and export the artifacts.

use std::sync::Arc;
use virvel::{DeploymentStore, Engine, ProcessDefinition, read_definition, render_svg};

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
        .expect("definition should validate")
}

#[test]
fn dynamic_deployment_runs_to_completion() {
    let engine = Engine::new(Arc::new(DeploymentStore::new()));
    let deployment = engine
        .deploy("Dynamic process deployment", vec![two_task_process()])
        .unwrap();
    assert_eq!(deployment.name(), "Dynamic process deployment");

    let instance = engine.start("my-process").unwrap();
    assert!(!instance.is_terminal());

    // Exactly the first task is active after start.
    let tasks = engine.active_tasks(instance.id()).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name(), "First task");
    assert_eq!(tasks[0].assignee(), Some("fred"));

    engine.complete_task(tasks[0].id()).unwrap();
    let tasks = engine.active_tasks(instance.id()).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name(), "Second task");
    assert_eq!(tasks[0].assignee(), Some("john"));

    engine.complete_task(tasks[0].id()).unwrap();
    assert!(engine.active_tasks(instance.id()).unwrap().is_empty());
    assert!(engine.instance(instance.id()).unwrap().is_terminal());
}

#[test]
fn deployment_artifacts_are_exportable() {
    let engine = Engine::new(Arc::new(DeploymentStore::new()));
    let deployment = engine
        .deploy("Dynamic process deployment", vec![two_task_process()])
        .unwrap();

    // Serialized definition resource round-trips to the deployed definition.
    let bytes = engine
        .store()
        .resource(deployment.id(), "my-process.bpmn")
        .unwrap();
    let read_back = read_definition(&String::from_utf8(bytes).unwrap()).unwrap();
    assert_eq!(&read_back, deployment.definitions()[0].as_ref());
    assert_eq!(read_back.version(), 1);

    let svg = render_svg(&read_back).unwrap();
    assert!(svg.starts_with(b"<svg"));
}

#[test]
fn redeploying_bumps_the_version() {
    let engine = Engine::new(Arc::new(DeploymentStore::new()));
    let first = engine.deploy("one", vec![two_task_process()]).unwrap();
    let second = engine.deploy("two", vec![two_task_process()]).unwrap();

    let v1 = first.definitions()[0].version();
    let v2 = second.definitions()[0].version();
    assert_eq!(v2, v1 + 1);

    // New instances pick up the latest version.
    assert_eq!(engine.start("my-process").unwrap().version(), v2);
}
