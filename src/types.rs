//! Instance records exchanged with the state store.

use chrono::{DateTime, Utc};
use conditions::ConditionLedger;
use inputhash::HashLedger;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a volume service instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId {
    pub namespace: String,
    pub name: String,
}

impl InstanceId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Object metadata relevant to reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    /// Incremented by the store on every desired-state change
    pub generation: i64,
    #[serde(default)]
    pub finalizers: Vec<String>,
    /// Set once deletion has been requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
    /// Name of the owning parent service
    pub owner: String,
}

impl ObjectMeta {
    pub fn id(&self) -> InstanceId {
        InstanceId::new(&self.namespace, &self.name)
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }

    /// Names of the parent-owned secrets every instance depends on
    pub fn parent_secret_names(&self) -> [String; 2] {
        [
            format!("{}-scripts", self.owner),
            format!("{}-config-data", self.owner),
        ]
    }

    /// Parent-rendered configuration secret
    pub fn parent_config_secret(&self) -> String {
        format!("{}-config-data", self.owner)
    }
}

/// TLS settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsSpec {
    /// Secret holding a CA bundle to trust
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle_secret_name: Option<String>,
}

impl TlsSpec {
    /// CA bundle secret name, if one is configured
    pub fn ca_bundle(&self) -> Option<&str> {
        self.ca_bundle_secret_name
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

/// Desired state declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    pub replicas: u32,
    /// Secret holding service credentials
    pub secret: String,
    /// Key in `secret` holding the service password
    #[serde(default = "default_password_selector")]
    pub password_selector: String,
    /// Secret holding the message bus transport URL
    pub transport_url_secret: String,
    /// Free-form configuration snippet
    #[serde(default)]
    pub custom_service_config: String,
    /// Secrets whose values are appended to the rendered configuration
    #[serde(default)]
    pub custom_service_config_secrets: Vec<String>,
    #[serde(default)]
    pub tls: TlsSpec,
    /// Network attachment definitions pods must be connected to
    #[serde(default)]
    pub network_attachments: Vec<String>,
}

fn default_password_selector() -> String {
    crate::config::DEFAULT_SERVICE_PASSWORD_KEY.to_string()
}

impl Default for VolumeSpec {
    fn default() -> Self {
        Self {
            replicas: 1,
            secret: String::new(),
            password_selector: default_password_selector(),
            transport_url_secret: String::new(),
            custom_service_config: String::new(),
            custom_service_config_secrets: Vec::new(),
            tls: TlsSpec::default(),
            network_attachments: Vec::new(),
        }
    }
}

/// Observed state written back by the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStatus {
    #[serde(default)]
    pub conditions: ConditionLedger,
    #[serde(default)]
    pub hash: HashLedger,
    /// Pod IPs per network attachment
    #[serde(default)]
    pub network_attachments: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub ready_count: u32,
    #[serde(default)]
    pub observed_generation: i64,
}

/// A volume service instance as held by the state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub metadata: ObjectMeta,
    pub spec: VolumeSpec,
    /// `None` until the reconciler has written status once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VolumeStatus>,
}

impl Instance {
    pub fn new(metadata: ObjectMeta, spec: VolumeSpec) -> Self {
        Self {
            metadata,
            spec,
            status: None,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.metadata.id()
    }
}

/// A resolved secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub data: BTreeMap<String, Vec<u8>>,
}

impl Secret {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Add a key, builder style
    pub fn with_entry(mut self, key: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        self.data.insert(key.into(), value.as_ref().to_vec());
        self
    }

    /// Add a label, builder style
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Value of `key` decoded as UTF-8, lossily
    pub fn text(&self, key: &str) -> Option<String> {
        self.data
            .get(key)
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    /// Content hash over the secret's data
    pub fn content_hash(&self) -> inputhash::Result<String> {
        inputhash::hash_value(&self.data)
    }
}
