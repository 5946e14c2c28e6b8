//! Convergence phases
//!
//! Each phase either lets the pass continue or ends it with a [`Flow`]. A
//! phase that ends the pass records why on its condition first.

use std::collections::BTreeMap;

use conditions::names::{
    DEPLOYMENT_READY, INPUT_READY, NETWORK_ATTACHMENTS_READY, READY, SERVICE_CONFIG_READY,
    TLS_INPUT_READY,
};
use conditions::{Severity, messages, reasons};
use inputhash::INPUT_HASH_KEY;

use super::Reconciler;
use super::flow::{Flow, Requeue};
use crate::cancel::CancelToken;
use crate::collaborators::{ConfigBundle, WorkloadInput};
use crate::error::{Error, Result};
use crate::types::{ObjectMeta, Secret, VolumeSpec, VolumeStatus};
use crate::workload::{config_bundle_name, networks_annotation, owned_labels, service_labels};

/// Key under which the CA bundle hash enters the input hash
pub const CA_BUNDLE_HASH_KEY: &str = "ca-bundle";

/// Files of the rendered config bundle
pub mod files {
    /// Parent-rendered defaults
    pub const DEFAULTS: &str = "00-global-defaults.conf";
    /// Parent-level custom config
    pub const PARENT_CUSTOM: &str = "01-global-custom.conf";
    /// Instance custom config, after augmentation
    pub const SERVICE_CUSTOM: &str = "02-service-custom.conf";
    /// Concatenated values of the custom config secrets
    pub const SECRETS: &str = "03-secrets.conf";
}

/// Working state of one pass over the phases
pub(crate) struct Pass<'a> {
    pub metadata: &'a ObjectMeta,
    pub spec: &'a VolumeSpec,
    pub status: &'a mut VolumeStatus,
    pub cancel: &'a CancelToken,
    /// Secrets resolved so far, by name
    secrets: BTreeMap<String, Secret>,
    /// Hashes feeding the input hash
    config_vars: BTreeMap<String, String>,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
    uses_fallback_driver: bool,
    input_hash: String,
}

impl<'a> Pass<'a> {
    pub fn new(
        metadata: &'a ObjectMeta,
        spec: &'a VolumeSpec,
        status: &'a mut VolumeStatus,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            metadata,
            spec,
            status,
            cancel,
            secrets: BTreeMap::new(),
            config_vars: BTreeMap::new(),
            labels: service_labels(metadata),
            annotations: BTreeMap::new(),
            uses_fallback_driver: false,
            input_hash: String::new(),
        }
    }

    fn namespace(&self) -> &'a str {
        &self.metadata.namespace
    }

    /// Record `err` on `condition` and end the pass
    ///
    /// A cancelled call ends the pass without touching `condition`.
    fn fail(&mut self, condition: &str, message: fn(&str) -> String, err: Error) -> Flow {
        if matches!(err, Error::Cancelled) {
            log::info!("'{}' cancelled", self.metadata.name);
            return Flow::Fail(err);
        }
        log::warn!("'{}': {}", self.metadata.name, err);
        self.status.conditions.mark_false(
            condition,
            reasons::ERROR,
            err.severity(),
            message(&err.to_string()),
        );
        Flow::Fail(err)
    }

    /// Record a pending input on `condition` and end the pass
    fn wait(&mut self, condition: &str, message: impl Into<String>, requeue: Requeue) -> Flow {
        self.status
            .conditions
            .mark_false(condition, reasons::REQUESTED, Severity::Info, message);
        Flow::Wait(requeue)
    }

    /// Remember a resolved secret and feed its hash into the input hash
    fn track(&mut self, secret: Secret) -> Result<()> {
        let hash = secret.content_hash()?;
        self.config_vars.insert(secret.name.clone(), hash);
        self.secrets.insert(secret.name.clone(), secret);
        Ok(())
    }

    /// Whether the aggregate Ready condition may be set True
    fn is_ready(&self) -> bool {
        let conditions = &self.status.conditions;
        let inputs_ready = conditions.all_true_except(&[READY, DEPLOYMENT_READY]);
        let deployment_ready = self.spec.replicas == 0
            || (self.status.ready_count > 0 && conditions.is_true(DEPLOYMENT_READY));
        inputs_ready && deployment_ready
    }
}

pub(crate) type Phase = fn(&Reconciler, &mut Pass<'_>) -> Flow;

/// Phases in execution order
pub(crate) const PHASES: &[(&str, Phase)] = &[
    ("service-secret", verify_service_secret as Phase),
    ("input-secrets", verify_input_secrets as Phase),
    ("tls-input", validate_tls as Phase),
    ("service-config", generate_service_config as Phase),
    ("input-hash", check_input_hash as Phase),
    ("network-attachments", verify_network_attachments as Phase),
    ("workload", converge_workload as Phase),
    ("network-status", verify_network_status as Phase),
    ("deployment-status", evaluate_deployment as Phase),
    ("ready", aggregate as Phase),
];

fn verify_service_secret(r: &Reconciler, pass: &mut Pass<'_>) -> Flow {
    let spec = pass.spec;
    let secret = match r.collab.secrets.resolve(&spec.secret, pass.namespace(), pass.cancel) {
        Ok(Some(secret)) => secret,
        Ok(None) => {
            log::info!("Secret {} not found", spec.secret);
            return pass.wait(
                INPUT_READY,
                messages::INPUT_READY_WAITING,
                Requeue::After(r.config.short_requeue()),
            );
        }
        Err(err) => return pass.fail(INPUT_READY, messages::input_error, err),
    };

    let key = if spec.password_selector.is_empty() {
        r.config.service_password_key.as_str()
    } else {
        spec.password_selector.as_str()
    };
    if !secret.data.contains_key(key) {
        let err = Error::MissingKey {
            secret: spec.secret.clone(),
            key: key.to_string(),
        };
        return pass.fail(INPUT_READY, messages::input_error, err);
    }

    match pass.track(secret) {
        Ok(()) => Flow::Continue,
        Err(err) => pass.fail(INPUT_READY, messages::input_error, err),
    }
}

fn verify_input_secrets(r: &Reconciler, pass: &mut Pass<'_>) -> Flow {
    let spec = pass.spec;
    let mut names = vec![spec.transport_url_secret.clone()];
    names.extend(pass.metadata.parent_secret_names());
    names.extend(spec.custom_service_config_secrets.iter().cloned());

    for name in names {
        if pass.secrets.contains_key(&name) {
            continue;
        }
        match r.collab.secrets.resolve(&name, pass.namespace(), pass.cancel) {
            Ok(Some(secret)) => {
                if let Err(err) = pass.track(secret) {
                    return pass.fail(INPUT_READY, messages::input_error, err);
                }
            }
            Ok(None) => {
                log::info!("Secret {name} not found");
                return pass.wait(
                    INPUT_READY,
                    messages::INPUT_READY_WAITING,
                    Requeue::After(r.config.short_requeue()),
                );
            }
            Err(err) => return pass.fail(INPUT_READY, messages::input_error, err),
        }
    }

    pass.status
        .conditions
        .mark_true(INPUT_READY, messages::INPUT_READY);
    Flow::Continue
}

fn validate_tls(r: &Reconciler, pass: &mut Pass<'_>) -> Flow {
    let spec = pass.spec;
    if let Some(ca_bundle) = spec.tls.ca_bundle() {
        match r
            .collab
            .tls
            .validate_ca_bundle(ca_bundle, pass.namespace(), pass.cancel)
        {
            Ok(hash) => {
                if !hash.is_empty() {
                    pass.config_vars.insert(CA_BUNDLE_HASH_KEY.to_string(), hash);
                }
            }
            Err(err) if err.is_not_found() => {
                log::info!("CA bundle {ca_bundle} not found");
                // The CA bundle secret is watched, its creation triggers us
                return pass.wait(
                    TLS_INPUT_READY,
                    messages::tls_input_waiting(ca_bundle),
                    Requeue::OnTrigger,
                );
            }
            Err(err) => return pass.fail(TLS_INPUT_READY, messages::tls_input_error, err),
        }
    }

    pass.status
        .conditions
        .mark_true(TLS_INPUT_READY, messages::INPUT_READY);
    Flow::Continue
}

/// Concatenate every value of `secrets`, in key order, one per line
fn concat_secret_values<'s>(secrets: impl IntoIterator<Item = &'s Secret>) -> String {
    let mut out = String::new();
    for secret in secrets {
        for value in secret.data.values() {
            out.push_str(&String::from_utf8_lossy(value));
            out.push('\n');
        }
    }
    out
}

fn render_config(r: &Reconciler, pass: &mut Pass<'_>) -> Result<ConfigBundle> {
    let metadata = pass.metadata;
    let spec = pass.spec;

    let (uses_fallback_driver, custom) = r
        .augmenter
        .augment(&spec.custom_service_config)
        .into_parts();
    pass.uses_fallback_driver = uses_fallback_driver;

    let parent_name = metadata.parent_config_secret();
    let parent = match pass.secrets.get(&parent_name) {
        Some(secret) => secret.clone(),
        None => r
            .collab
            .secrets
            .require(&parent_name, &metadata.namespace, pass.cancel)?,
    };

    let custom_secrets = spec
        .custom_service_config_secrets
        .iter()
        .map(|name| match pass.secrets.get(name) {
            Some(secret) => Ok(secret.clone()),
            None => r
                .collab
                .secrets
                .require(name, &metadata.namespace, pass.cancel),
        })
        .collect::<Result<Vec<_>>>()?;

    let data = BTreeMap::from([
        (
            files::DEFAULTS.to_string(),
            parent.text(files::DEFAULTS).unwrap_or_default(),
        ),
        (
            files::PARENT_CUSTOM.to_string(),
            parent.text(files::PARENT_CUSTOM).unwrap_or_default(),
        ),
        (files::SERVICE_CUSTOM.to_string(), custom),
        (files::SECRETS.to_string(), concat_secret_values(&custom_secrets)),
    ]);

    Ok(ConfigBundle {
        name: config_bundle_name(&metadata.name),
        namespace: metadata.namespace.clone(),
        labels: owned_labels(metadata),
        data,
    })
}

fn generate_service_config(r: &Reconciler, pass: &mut Pass<'_>) -> Flow {
    let result = render_config(r, pass).and_then(|bundle| {
        r.collab.configs.write(&bundle, pass.cancel)?;
        let hash = bundle.content_hash()?;
        Ok((bundle.name, hash))
    });

    match result {
        Ok((name, hash)) => {
            pass.config_vars.insert(name, hash);
            Flow::Continue
        }
        Err(err) if err.is_not_found() => {
            log::info!("{err}, waiting");
            pass.wait(
                SERVICE_CONFIG_READY,
                messages::service_config_waiting(&err.to_string()),
                Requeue::After(r.config.short_requeue()),
            )
        }
        Err(err) => pass.fail(SERVICE_CONFIG_READY, messages::service_config_error, err),
    }
}

fn check_input_hash(_r: &Reconciler, pass: &mut Pass<'_>) -> Flow {
    let hash = match inputhash::stable_hash(pass.config_vars.iter().map(|(k, v)| (k.as_str(), v))) {
        Ok(hash) => hash,
        Err(err) => {
            return pass.fail(
                SERVICE_CONFIG_READY,
                messages::service_config_error,
                err.into(),
            );
        }
    };

    if pass.status.hash.record(INPUT_HASH_KEY, &hash) {
        log::info!("Input maps hash {INPUT_HASH_KEY} - {hash}");
        return Flow::Wait(Requeue::Immediately);
    }

    pass.input_hash = hash;
    pass.status
        .conditions
        .mark_true(SERVICE_CONFIG_READY, messages::SERVICE_CONFIG_READY);
    Flow::Continue
}

fn verify_network_attachments(r: &Reconciler, pass: &mut Pass<'_>) -> Flow {
    let spec = pass.spec;
    for attachment in &spec.network_attachments {
        match r.collab.networks.exists(attachment, pass.namespace(), pass.cancel) {
            Ok(true) => {}
            Ok(false) => {
                log::info!("network-attachment-definition {attachment} not found");
                return pass.wait(
                    NETWORK_ATTACHMENTS_READY,
                    messages::network_attachments_waiting(attachment),
                    Requeue::After(r.config.normal_requeue()),
                );
            }
            Err(err) => {
                return pass.fail(
                    NETWORK_ATTACHMENTS_READY,
                    messages::network_attachments_error,
                    err,
                );
            }
        }
    }

    match networks_annotation(pass.namespace(), &spec.network_attachments) {
        Ok(annotations) => {
            pass.annotations = annotations;
            Flow::Continue
        }
        Err(err) => pass.fail(
            NETWORK_ATTACHMENTS_READY,
            messages::network_attachments_error,
            err,
        ),
    }
}

fn converge_workload(r: &Reconciler, pass: &mut Pass<'_>) -> Flow {
    let resource = r.collab.builder.build(&WorkloadInput {
        metadata: pass.metadata,
        spec: pass.spec,
        input_hash: &pass.input_hash,
        labels: &pass.labels,
        annotations: &pass.annotations,
        uses_fallback_driver: pass.uses_fallback_driver,
    });

    let applied = match r.collab.applier.create_or_update(&resource, pass.cancel) {
        Ok(applied) => applied,
        Err(err) => return pass.fail(DEPLOYMENT_READY, messages::deployment_error, err),
    };

    if applied.is_lagging() {
        log::debug!(
            "Workload {} at generation {}, observed {}",
            applied.name,
            applied.generation,
            applied.observed_generation
        );
        pass.status.conditions.mark_false(
            NETWORK_ATTACHMENTS_READY,
            reasons::REQUESTED,
            Severity::Info,
            messages::NETWORK_ATTACHMENTS_READY_INIT,
        );
        return pass.wait(
            DEPLOYMENT_READY,
            messages::DEPLOYMENT_READY_RUNNING,
            Requeue::After(r.config.short_requeue()),
        );
    }

    pass.status.ready_count = applied.ready_replicas;
    Flow::Continue
}

fn verify_network_status(r: &Reconciler, pass: &mut Pass<'_>) -> Flow {
    let spec = pass.spec;
    let (all_ready, ips) = if spec.replicas == 0 {
        (true, BTreeMap::new())
    } else {
        match r.collab.networks.verify_status(
            &spec.network_attachments,
            pass.namespace(),
            &pass.labels,
            pass.status.ready_count,
            pass.cancel,
        ) {
            Ok(status) => (status.all_ready, status.ips),
            Err(err) => {
                return pass.fail(
                    NETWORK_ATTACHMENTS_READY,
                    messages::network_attachments_error,
                    err,
                );
            }
        }
    };
    pass.status.network_attachments = ips;

    if !all_ready {
        let err = Error::NotReady {
            message: format!(
                "not all pods have interfaces with ips as configured in NetworkAttachments: {}",
                spec.network_attachments.join(", ")
            ),
        };
        return pass.fail(
            NETWORK_ATTACHMENTS_READY,
            messages::network_attachments_error,
            err,
        );
    }

    pass.status
        .conditions
        .mark_true(NETWORK_ATTACHMENTS_READY, messages::NETWORK_ATTACHMENTS_READY);
    Flow::Continue
}

fn evaluate_deployment(_r: &Reconciler, pass: &mut Pass<'_>) -> Flow {
    let conditions = &mut pass.status.conditions;
    if pass.status.ready_count > 0 {
        conditions.mark_true(DEPLOYMENT_READY, messages::DEPLOYMENT_READY);
    } else if pass.spec.replicas > 0 {
        conditions.mark_false(
            DEPLOYMENT_READY,
            reasons::REQUESTED,
            Severity::Info,
            messages::DEPLOYMENT_READY_RUNNING,
        );
    } else {
        conditions.mark_false(
            DEPLOYMENT_READY,
            reasons::NOT_REQUESTED,
            Severity::Info,
            messages::DEPLOYMENT_READY_INIT,
        );
    }
    Flow::Continue
}

fn aggregate(_r: &Reconciler, pass: &mut Pass<'_>) -> Flow {
    if pass.is_ready() {
        pass.status.conditions.mark_true(READY, messages::READY);
    }
    Flow::Continue
}
