use crate::error::{Error, Result};
use crate::model::{ProcessDefinition, validate};
use crate::xml;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

pub type DeploymentId = u64;

/// An atomic unit of definitions introduced into the store, together with
/// the serialized form of each definition as named opaque resources.
#[derive(Debug)]
pub struct Deployment {
    id: DeploymentId,
    name: String,
    timestamp: SystemTime,
    definitions: Vec<Arc<ProcessDefinition>>,
    resources: Vec<(String, Vec<u8>)>,
}

impl Deployment {
    pub fn id(&self) -> DeploymentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// The definitions this deployment introduced, with versions assigned.
    pub fn definitions(&self) -> &[Arc<ProcessDefinition>] {
        &self.definitions
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|(name, _)| name.as_str())
    }

    pub fn resource(&self, name: &str) -> Option<&[u8]> {
        self.resources
            .iter()
            .find(|(resource, _)| resource == name)
            .map(|(_, bytes)| bytes.as_slice())
    }
}

#[derive(Default)]
struct Inner {
    deployments: HashMap<DeploymentId, Arc<Deployment>>,
    latest: HashMap<String, Arc<ProcessDefinition>>,
    next_id: DeploymentId,
}

/// Append-only store of immutable, versioned process definitions.
///
/// Reads take a shared lock; `deploy` holds the write lock for the whole
/// operation, which keeps version numbers monotonic per process id.
#[derive(Default)]
pub struct DeploymentStore {
    inner: RwLock<Inner>,
}

impl DeploymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a batch of definitions atomically.
    ///
    /// Every definition is validated before anything is stored; each gets
    /// version `latest + 1` for its process id (re-deploying identical
    /// content still bumps the version) and its XML form is attached as a
    /// resource named `<process id>.bpmn`.
    pub fn deploy(
        &self,
        name: impl Into<String>,
        definitions: Vec<ProcessDefinition>,
    ) -> Result<Arc<Deployment>> {
        for definition in &definitions {
            validate::validate(definition.nodes(), definition.flows())?;
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        // Stage everything fallible before touching the maps, so a failed
        // deployment leaves no version behind.
        let mut versions: HashMap<String, u32> = HashMap::new();
        let mut staged = Vec::with_capacity(definitions.len());
        let mut resources = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let version = versions
                .get(definition.id())
                .copied()
                .or_else(|| inner.latest.get(definition.id()).map(|d| d.version()))
                .unwrap_or(0)
                + 1;
            versions.insert(definition.id().to_owned(), version);

            let definition = Arc::new(definition.with_version(version));
            resources.push((
                format!("{}.bpmn", definition.id()),
                xml::write_definition(&definition)?,
            ));
            staged.push(definition);
        }

        inner.next_id += 1;
        let deployment = Arc::new(Deployment {
            id: inner.next_id,
            name: name.into(),
            timestamp: SystemTime::now(),
            definitions: staged,
            resources,
        });
        for definition in &deployment.definitions {
            debug!(
                "deployment {} ({}): process \"{}\" now at v{}",
                deployment.id,
                deployment.name,
                definition.id(),
                definition.version()
            );
            inner
                .latest
                .insert(definition.id().to_owned(), Arc::clone(definition));
        }
        inner.deployments.insert(deployment.id, Arc::clone(&deployment));
        Ok(deployment)
    }

    /// Latest deployed version of a process.
    pub fn latest(&self, process_id: &str) -> Result<Arc<ProcessDefinition>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .get(process_id)
            .cloned()
            .ok_or_else(|| Error::ProcessNotFound(process_id.to_owned()))
    }

    pub fn deployment(&self, deployment_id: DeploymentId) -> Result<Arc<Deployment>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .deployments
            .get(&deployment_id)
            .cloned()
            .ok_or(Error::DeploymentNotFound(deployment_id))
    }

    /// Byte stream of a named deployment resource.
    pub fn resource(&self, deployment_id: DeploymentId, name: &str) -> Result<Vec<u8>> {
        let deployment = self.deployment(deployment_id)?;
        deployment
            .resource(name)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::ResourceNotFound(deployment_id, name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(process_id: &str) -> ProcessDefinition {
        ProcessDefinition::builder(process_id)
            .start_event("s")
            .user_task("t", "T", Some("fred"))
            .end_event("end")
            .flow("s", "t")
            .flow("t", "end")
            .build()
            .unwrap()
    }

    #[test]
    fn versions_are_strictly_increasing() {
        let store = DeploymentStore::new();
        let first = store.deploy("one", vec![minimal("p")]).unwrap();
        let second = store.deploy("two", vec![minimal("p")]).unwrap();

        let v1 = first.definitions()[0].version();
        let v2 = second.definitions()[0].version();
        assert_eq!(v1, 1);
        assert_eq!(v2, v1 + 1);
        assert_eq!(store.latest("p").unwrap().version(), 2);
    }

    #[test]
    fn batch_with_repeated_process_id_versions_in_order() {
        let store = DeploymentStore::new();
        let deployment = store
            .deploy("batch", vec![minimal("p"), minimal("p")])
            .unwrap();
        let versions: Vec<u32> = deployment
            .definitions()
            .iter()
            .map(|d| d.version())
            .collect();
        assert_eq!(versions, [1, 2]);
    }

    #[test]
    fn unknown_process_is_not_found() {
        let store = DeploymentStore::new();
        assert!(matches!(
            store.latest("ghost").unwrap_err(),
            Error::ProcessNotFound(id) if id == "ghost"
        ));
    }

    #[test]
    fn serialized_definition_is_attached_as_resource() {
        let store = DeploymentStore::new();
        let deployment = store.deploy("with resource", vec![minimal("p")]).unwrap();

        let bytes = store.resource(deployment.id(), "p.bpmn").unwrap();
        let read_back = crate::xml::read_definition(&String::from_utf8(bytes).unwrap()).unwrap();
        assert_eq!(&read_back, deployment.definitions()[0].as_ref());
    }

    #[test]
    fn missing_resource_and_deployment_are_reported() {
        let store = DeploymentStore::new();
        let deployment = store.deploy("d", vec![minimal("p")]).unwrap();
        assert!(matches!(
            store.resource(deployment.id(), "other.bpmn").unwrap_err(),
            Error::ResourceNotFound(_, name) if name == "other.bpmn"
        ));
        assert!(matches!(
            store.deployment(42).unwrap_err(),
            Error::DeploymentNotFound(42)
        ));
    }

    #[test]
    fn deployment_is_immutable_once_stored() {
        let store = DeploymentStore::new();
        let id = store.deploy("d", vec![minimal("p")]).unwrap().id();
        let deployment = store.deployment(id).unwrap();
        assert_eq!(deployment.name(), "d");
        assert_eq!(deployment.resource_names().collect::<Vec<_>>(), ["p.bpmn"]);
    }
}
