use std::fs;
use std::sync::Arc;
use virvel::{DeploymentStore, Engine, ProcessDefinition};

extern crate pretty_env_logger;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    // Build the process graph from scratch
    let definition = ProcessDefinition::builder("my-process")
        .start_event("start")
        .user_task("task1", "First task", Some("fred"))
        .user_task("task2", "Second task", Some("john"))
        .end_event("end")
        .flow("start", "task1")
        .flow("task1", "task2")
        .flow("task2", "end")
        .build()?;

    // Deploy it and start an instance
    let engine = Engine::new(Arc::new(DeploymentStore::new()));
    let deployment = engine.deploy("Dynamic process deployment", vec![definition])?;
    let instance = engine.start("my-process")?;

    // Work through the tasks
    while let Some(task) = engine.active_tasks(instance.id())?.first() {
        println!(
            "completing \"{}\" assigned to {}",
            task.name(),
            task.assignee().unwrap_or("nobody")
        );
        engine.complete_task(task.id())?;
    }
    println!(
        "instance {} terminal: {}",
        instance.id(),
        engine.instance(instance.id())?.is_terminal()
    );

    // Export the diagram and the deployed definition XML
    fs::create_dir_all("target/export")?;
    let deployed = engine.store().latest("my-process")?;
    fs::write("target/export/diagram.svg", virvel::render_svg(&deployed)?)?;
    fs::write(
        "target/export/my-process.bpmn20.xml",
        engine.store().resource(deployment.id(), "my-process.bpmn")?,
    )?;
    println!("wrote target/export/diagram.svg and target/export/my-process.bpmn20.xml");
    Ok(())
}
