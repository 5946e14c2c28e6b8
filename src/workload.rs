//! Workload resource construction
//!
//! Labels, pod annotations and the default [`WorkloadBuilder`].

use serde::Serialize;
use std::collections::BTreeMap;

use crate::collaborators::{ResourceSpec, WorkloadBuilder, WorkloadInput};
use crate::error::Result;
use crate::types::ObjectMeta;

/// Pod annotation listing the network attachments
pub const NETWORKS_ANNOTATION: &str = "k8s.v1.cni.cncf.io/networks";

/// Pod annotation carrying the input hash; a new value restarts pods
pub const INPUT_HASH_ANNOTATION: &str = "cinder.openstack.org/input-hash";

/// Label selecting objects owned by a service
pub const OWNER_NAME_LABEL: &str = "cinder.openstack.org/name";

/// Label carrying the owner's namespace
pub const OWNER_NAMESPACE_LABEL: &str = "cinder.openstack.org/namespace";

const SERVICE_NAME: &str = "cinder";
const COMPONENT: &str = "cinder-volume";

/// Name of the rendered config bundle for an instance
pub fn config_bundle_name(instance_name: &str) -> String {
    format!("{instance_name}-config-data")
}

/// Backend part of an instance name (`<owner>-volume-<backend>`)
pub fn backend_name(metadata: &ObjectMeta) -> &str {
    let prefix = format!("{}-volume-", metadata.owner);
    metadata
        .name
        .strip_prefix(prefix.as_str())
        .unwrap_or(&metadata.name)
}

/// Labels identifying the service's pods
pub fn service_labels(metadata: &ObjectMeta) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("service".to_string(), SERVICE_NAME.to_string()),
        ("component".to_string(), COMPONENT.to_string()),
        ("backend".to_string(), backend_name(metadata).to_string()),
    ])
}

/// Service labels plus ownership labels, for generated objects
pub fn owned_labels(metadata: &ObjectMeta) -> BTreeMap<String, String> {
    let mut labels = service_labels(metadata);
    labels.insert(OWNER_NAME_LABEL.to_string(), metadata.name.clone());
    labels.insert(OWNER_NAMESPACE_LABEL.to_string(), metadata.namespace.clone());
    labels
}

#[derive(Debug, Serialize)]
struct NetworkSelection<'a> {
    name: &'a str,
    namespace: &'a str,
}

/// Pod annotations requesting `attachments` from `namespace`
pub fn networks_annotation(
    namespace: &str,
    attachments: &[String],
) -> Result<BTreeMap<String, String>> {
    let selections: Vec<NetworkSelection<'_>> = attachments
        .iter()
        .map(|name| NetworkSelection {
            name: name.as_str(),
            namespace,
        })
        .collect();
    let value = serde_json::to_string(&selections)?;
    Ok(BTreeMap::from([(NETWORKS_ANNOTATION.to_string(), value)]))
}

/// Builds a stateful workload running the volume service
#[derive(Debug, Clone, Copy, Default)]
pub struct StatefulSetBuilder;

impl WorkloadBuilder for StatefulSetBuilder {
    fn build(&self, input: &WorkloadInput<'_>) -> ResourceSpec {
        let mut annotations = input.annotations.clone();
        annotations.insert(
            INPUT_HASH_ANNOTATION.to_string(),
            input.input_hash.to_string(),
        );

        ResourceSpec {
            name: input.metadata.name.clone(),
            namespace: input.metadata.namespace.clone(),
            replicas: input.spec.replicas,
            labels: input.labels.clone(),
            annotations,
            config_bundle: config_bundle_name(&input.metadata.name),
            privileged: input.uses_fallback_driver,
        }
    }
}
