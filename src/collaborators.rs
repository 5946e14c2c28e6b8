//! Collaborator traits
//!
//! The reconciler talks to the outside world only through these traits, so
//! it can run against a real cluster client or in-memory fakes alike.
//!
//! Calls made while converging receive the invocation's [`CancelToken`].
//! Implementations that block should poll it and give up with
//! [`Error::Cancelled`] once it fires. Store writes take no token: status is
//! persisted even after cancellation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::types::{Instance, InstanceId, ObjectMeta, Secret, VolumeSpec, VolumeStatus};

/// Storage for instance records
///
/// Writes must use optimistic concurrency and report a lost race as
/// [`Error::Conflict`].
pub trait StateStore: Send + Sync {
    /// Fetch an instance; `None` if it no longer exists
    fn get(&self, id: &InstanceId) -> Result<Option<Instance>>;

    /// Replace the status of an instance
    fn patch_status(&self, id: &InstanceId, status: &VolumeStatus) -> Result<()>;

    /// Replace the finalizer list of an instance
    fn patch_finalizers(&self, id: &InstanceId, finalizers: &[String]) -> Result<()>;
}

/// Lookup of secrets by name
pub trait SecretProvider: Send + Sync {
    /// Resolve a secret; `None` if it does not exist
    fn resolve(&self, name: &str, namespace: &str, cancel: &CancelToken) -> Result<Option<Secret>>;

    /// Resolve a secret and require it to exist
    fn require(&self, name: &str, namespace: &str, cancel: &CancelToken) -> Result<Secret> {
        self.resolve(name, namespace, cancel)?
            .ok_or_else(|| Error::secret_not_found(name))
    }
}

/// Validation of TLS inputs
pub trait TlsValidator: Send + Sync {
    /// Validate a CA bundle secret and return its content hash
    ///
    /// A missing secret is reported as [`Error::NotFound`]; an empty hash
    /// means there is nothing to track.
    fn validate_ca_bundle(
        &self,
        secret_name: &str,
        namespace: &str,
        cancel: &CancelToken,
    ) -> Result<String>;
}

/// A rendered configuration bundle, persisted as a secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    /// File name to file content
    pub data: BTreeMap<String, String>,
}

impl ConfigBundle {
    /// Content hash of the bundle's files
    pub fn content_hash(&self) -> inputhash::Result<String> {
        inputhash::hash_value(&self.data)
    }
}

/// Persistence of rendered configuration
pub trait ConfigWriter: Send + Sync {
    /// Create or update the bundle
    fn write(&self, bundle: &ConfigBundle, cancel: &CancelToken) -> Result<()>;
}

/// Everything the workload builder needs
#[derive(Debug, Clone, Copy)]
pub struct WorkloadInput<'a> {
    pub metadata: &'a ObjectMeta,
    pub spec: &'a VolumeSpec,
    /// Aggregate input hash; changes roll the workload
    pub input_hash: &'a str,
    pub labels: &'a BTreeMap<String, String>,
    /// Pod annotations (network attachments)
    pub annotations: &'a BTreeMap<String, String>,
    /// The workload needs host privileges for the fallback driver
    pub uses_fallback_driver: bool,
}

/// Desired workload resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub name: String,
    pub namespace: String,
    pub replicas: u32,
    pub labels: BTreeMap<String, String>,
    /// Pod template annotations, including the input hash
    pub annotations: BTreeMap<String, String>,
    /// Name of the config bundle mounted into pods
    pub config_bundle: String,
    /// Pods run with host access (iSCSI, LVM)
    pub privileged: bool,
}

/// Builds the workload resource for an instance
pub trait WorkloadBuilder: Send + Sync {
    fn build(&self, input: &WorkloadInput<'_>) -> ResourceSpec;
}

/// Outcome of a create-or-update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedResource {
    pub name: String,
    /// Generation of the applied resource
    pub generation: i64,
    /// Generation its controller has observed
    pub observed_generation: i64,
    pub ready_replicas: u32,
    /// The applier asks the caller to come back later
    pub requires_wait: bool,
}

impl AppliedResource {
    /// Whether the resource's controller has not caught up yet
    pub fn is_lagging(&self) -> bool {
        self.requires_wait || self.generation != self.observed_generation
    }
}

/// Creates or updates workload resources
pub trait ResourceApplier: Send + Sync {
    fn create_or_update(
        &self,
        spec: &ResourceSpec,
        cancel: &CancelToken,
    ) -> Result<AppliedResource>;
}

/// Network attachment status of a workload's pods
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    /// Every pod reports every expected attachment
    pub all_ready: bool,
    /// Reported IPs per attachment
    pub ips: BTreeMap<String, Vec<String>>,
}

/// Knowledge about network attachment definitions
pub trait NetworkAttachmentOracle: Send + Sync {
    /// Whether a definition exists
    fn exists(&self, name: &str, namespace: &str, cancel: &CancelToken) -> Result<bool>;

    /// Check that `expected_ready` pods selected by `labels` report all attachments
    fn verify_status(
        &self,
        attachments: &[String],
        namespace: &str,
        labels: &BTreeMap<String, String>,
        expected_ready: u32,
        cancel: &CancelToken,
    ) -> Result<NetworkStatus>;
}

/// The set of collaborators handed to a reconciler
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn StateStore>,
    pub secrets: Arc<dyn SecretProvider>,
    pub tls: Arc<dyn TlsValidator>,
    pub configs: Arc<dyn ConfigWriter>,
    pub builder: Arc<dyn WorkloadBuilder>,
    pub applier: Arc<dyn ResourceApplier>,
    pub networks: Arc<dyn NetworkAttachmentOracle>,
}
