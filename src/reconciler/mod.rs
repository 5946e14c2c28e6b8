//! Reconciliation of a single instance
//!
//! An invocation loads the instance, decides its lifecycle step, runs the
//! phases in order and persists status on every exit path:
//!
//! ```text
//! get ─▶ lifecycle ─┬─ Delete ───▶ persist ─▶ done
//!                   ├─ Register ─▶ persist ─▶ requeue
//!                   └─ Converge ─▶ phases ─▶ persist ─▶ result
//! ```
//!
//! Persisting writes finalizer changes first, then status. The status write
//! is attempted even when the finalizer write failed.

pub mod flow;
pub(crate) mod phases;


use conditions::ConditionLedger;
use conditions::names::{
    DEPLOYMENT_READY, INPUT_READY, NETWORK_ATTACHMENTS_READY, READY, SERVICE_CONFIG_READY,
    TLS_INPUT_READY,
};

use backendconf::Augmenter;

use crate::cancel::CancelToken;
use crate::collaborators::Collaborators;
use crate::config::ReconcilerConfig;
use crate::error::Result;
use crate::lifecycle::{LifecycleGuard, LifecycleStep};
use crate::retry::{RetryConfig, with_retry};
use crate::types::{Instance, InstanceId, ObjectMeta, VolumeStatus};

pub use flow::{Flow, ReconcileResult, Requeue};
pub use phases::{CA_BUNDLE_HASH_KEY, files};

use phases::{PHASES, Pass};

/// Conditions tracked on every instance, in the order Ready mirrors them
pub const TRACKED_CONDITIONS: &[&str] = &[
    READY,
    INPUT_READY,
    SERVICE_CONFIG_READY,
    DEPLOYMENT_READY,
    NETWORK_ATTACHMENTS_READY,
    TLS_INPUT_READY,
];

/// Drives instances toward their desired state.
pub struct Reconciler {
    pub(crate) config: ReconcilerConfig,
    pub(crate) collab: Collaborators,
    pub(crate) augmenter: Augmenter,
    retry: RetryConfig,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig, collab: Collaborators) -> Self {
        let augmenter = Augmenter::new(config.fallback_driver_suffix.clone());
        let retry = config.status_retry();
        Self {
            config,
            collab,
            augmenter,
            retry,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Reconcile an instance once.
    pub fn reconcile_once(&self, id: &InstanceId) -> Result<ReconcileResult> {
        self.reconcile_with(id, &CancelToken::new())
    }

    /// Reconcile an instance once, stopping between phases if `cancel` fires.
    pub fn reconcile_with(&self, id: &InstanceId, cancel: &CancelToken) -> Result<ReconcileResult> {
        log::info!("Reconciling Service '{id}'");

        let Some(instance) = self.collab.store.get(id)? else {
            log::debug!("'{id}' not found, nothing to do");
            return Ok(ReconcileResult::done());
        };

        let Instance {
            mut metadata,
            spec,
            status,
        } = instance;
        let first_observation = status.is_none();
        let previous = status.unwrap_or_default();
        let original_finalizers = metadata.finalizers.clone();

        let guard = LifecycleGuard::new(&self.config.finalizer);
        let step = guard.step(&mut metadata, first_observation);
        if step == LifecycleStep::Delete {
            return self.delete(id, &metadata, &original_finalizers, previous);
        }

        let mut status = fresh_status(&previous, metadata.generation);
        let flow = match step {
            LifecycleStep::Register => {
                log::info!("Reconciling Service '{id}' init");
                Flow::Wait(Requeue::Immediately)
            }
            _ => {
                let mut pass = Pass::new(&metadata, &spec, &mut status, cancel);
                self.converge(&mut pass, cancel)
            }
        };

        let persisted = self.persist(
            id,
            &original_finalizers,
            &metadata.finalizers,
            &previous.conditions,
            &mut status,
        );
        finish(id, flow, persisted)
    }

    /// Release the finalizer and write back the last status.
    ///
    /// Once the last finalizer is gone the store may drop the instance, so a
    /// NotFound on the status write counts as done.
    fn delete(
        &self,
        id: &InstanceId,
        metadata: &ObjectMeta,
        original_finalizers: &[String],
        previous: VolumeStatus,
    ) -> Result<ReconcileResult> {
        log::info!("Reconciling Service '{id}' delete");

        let mut status = VolumeStatus {
            observed_generation: metadata.generation,
            ..previous.clone()
        };
        match self.persist(
            id,
            original_finalizers,
            &metadata.finalizers,
            &previous.conditions,
            &mut status,
        ) {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                log::debug!("'{id}' removed, no status to write");
            }
            Err(err) => return Err(err),
        }

        log::info!("Reconciled Service '{id}' delete successfully");
        Ok(ReconcileResult::done())
    }

    /// Run the phases in order until one ends the pass.
    fn converge(&self, pass: &mut Pass<'_>, cancel: &CancelToken) -> Flow {
        for (name, phase) in PHASES {
            if let Err(err) = cancel.check() {
                log::info!("'{}' cancelled before phase {name}", pass.metadata.name);
                return Flow::Fail(err);
            }
            log::debug!("'{}': phase {name}", pass.metadata.name);
            match phase(self, pass) {
                Flow::Continue => {}
                other => return other,
            }
        }
        Flow::Continue
    }

    fn patch_finalizers(&self, id: &InstanceId, finalizers: &[String]) -> Result<()> {
        with_retry(&self.retry, |_| {
            self.collab.store.patch_finalizers(id, finalizers)
        })
    }

    /// Write finalizer changes, then status, returning the first error.
    fn persist(
        &self,
        id: &InstanceId,
        original_finalizers: &[String],
        finalizers: &[String],
        previous: &ConditionLedger,
        status: &mut VolumeStatus,
    ) -> Result<()> {
        let finalizers_written = if finalizers == original_finalizers {
            Ok(())
        } else {
            self.patch_finalizers(id, finalizers)
        };
        if let Err(err) = &finalizers_written {
            log::warn!("Failed to update finalizers of '{id}': {err}");
        }
        let status_written = self.persist_status(id, previous, status);
        finalizers_written.and(status_written)
    }

    /// Finish the condition ledger and write status, resending on conflict.
    fn persist_status(
        &self,
        id: &InstanceId,
        previous: &ConditionLedger,
        status: &mut VolumeStatus,
    ) -> Result<()> {
        if status.conditions.is_unknown(READY) {
            let mirrored = status.conditions.mirror(READY);
            status.conditions.set(mirrored);
        }
        status.conditions.restore_transition_times(previous);

        let status = &*status;
        with_retry(&self.retry, |attempt| {
            if attempt > 0 {
                if self.collab.store.get(id)?.is_none() {
                    log::debug!("'{id}' disappeared, dropping status update");
                    return Ok(());
                }
                log::debug!("Resending status for '{id}'");
            }
            self.collab.store.patch_status(id, status)
        })
    }
}

/// Status to build during this invocation.
///
/// Conditions start over as Unknown; everything else carries over.
fn fresh_status(previous: &VolumeStatus, generation: i64) -> VolumeStatus {
    let mut conditions = ConditionLedger::new();
    conditions.init(TRACKED_CONDITIONS);
    VolumeStatus {
        conditions,
        observed_generation: generation,
        ..previous.clone()
    }
}

fn finish(id: &InstanceId, flow: Flow, persisted: Result<()>) -> Result<ReconcileResult> {
    match (flow, persisted) {
        (Flow::Fail(err), Err(persist_err)) => {
            log::warn!("'{id}' failed: {err}");
            Err(persist_err)
        }
        (_, Err(persist_err)) => Err(persist_err),
        (Flow::Fail(err), Ok(())) => Err(err),
        (Flow::Wait(requeue), Ok(())) => Ok(requeue.into()),
        (Flow::Continue, Ok(())) => {
            log::info!("Reconciled Service '{id}' successfully");
            Ok(ReconcileResult::done())
        }
    }
}
