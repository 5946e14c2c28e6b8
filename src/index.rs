//! Reverse index from secrets to the instances that depend on them
//!
//! An instance is affected by a secret change when the secret is:
//! - its service secret
//! - its CA bundle secret
//! - one of its custom config secrets
//! - labeled as owned by the instance's parent service

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Instance, InstanceId, Secret};
use crate::workload::OWNER_NAME_LABEL;

type Key = (String, String);

/// Secret → instance lookup for one or more namespaces
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    by_secret: BTreeMap<Key, BTreeSet<InstanceId>>,
    by_owner: BTreeMap<Key, BTreeSet<InstanceId>>,
}

/// Names of the secrets an instance references directly
pub fn watched_secrets(instance: &Instance) -> Vec<&str> {
    let spec = &instance.spec;
    let mut names: Vec<&str> = Vec::new();
    if !spec.secret.is_empty() {
        names.push(&spec.secret);
    }
    if let Some(ca) = spec.tls.ca_bundle() {
        names.push(ca);
    }
    names.extend(
        spec.custom_service_config_secrets
            .iter()
            .map(String::as_str)
            .filter(|name| !name.is_empty()),
    );
    names
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index over `instances`
    pub fn build<'a>(instances: impl IntoIterator<Item = &'a Instance>) -> Self {
        let mut index = Self::new();
        for instance in instances {
            index.insert(instance);
        }
        index
    }

    /// Add or refresh an instance
    pub fn insert(&mut self, instance: &Instance) {
        let id = instance.id();
        self.remove(&id);

        for name in watched_secrets(instance) {
            self.by_secret
                .entry((id.namespace.clone(), name.to_string()))
                .or_default()
                .insert(id.clone());
        }
        if !instance.metadata.owner.is_empty() {
            self.by_owner
                .entry((id.namespace.clone(), instance.metadata.owner.clone()))
                .or_default()
                .insert(id);
        }
    }

    /// Forget an instance
    pub fn remove(&mut self, id: &InstanceId) {
        for map in [&mut self.by_secret, &mut self.by_owner] {
            map.retain(|_, ids| {
                ids.remove(id);
                !ids.is_empty()
            });
        }
    }

    /// Instances to re-reconcile after `secret` changed.
    ///
    /// Each instance appears once, in stable (namespace, name) order.
    pub fn affected_by(&self, secret: &Secret) -> Vec<InstanceId> {
        let mut affected = BTreeSet::new();

        let key = (secret.namespace.clone(), secret.name.clone());
        if let Some(ids) = self.by_secret.get(&key) {
            affected.extend(ids.iter().cloned());
        }

        if let Some(owner) = secret.labels.get(OWNER_NAME_LABEL) {
            let key = (secret.namespace.clone(), owner.clone());
            if let Some(ids) = self.by_owner.get(&key) {
                affected.extend(ids.iter().cloned());
            }
        }

        if !affected.is_empty() {
            log::info!(
                "Input source {}/{} changed, reconcile: {} instance(s)",
                secret.namespace,
                secret.name,
                affected.len()
            );
        }
        affected.into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_secret.is_empty() && self.by_owner.is_empty()
    }
}
