//! # volume-reconciler
//!
//! Level-triggered reconciliation engine for block-storage volume services.
//!
//! Each invocation reads one volume instance, resolves the secrets it
//! depends on, renders its configuration bundle, applies its workload and
//! records the outcome as a set of status conditions:
//!
//! - Finalizer bookkeeping on creation and deletion
//! - Input hashing, so a workload only rolls when its inputs change
//! - Backend config augmentation (`enabled_backends`, fallback driver)
//! - Conflict-aware status writes with exponential backoff
//! - Parallel reconciliation of many instances
//!
//! ## Wiring
//!
//! The engine never talks to a cluster directly. Everything external goes
//! through the traits in [`collaborators`]:
//!
//! ```text
//! let collab = Collaborators { store, secrets, tls, configs, builder, applier, networks };
//! let reconciler = Reconciler::new(ReconcilerConfig::load(None)?, collab);
//!
//! match reconciler.reconcile_once(&id)? {
//!     r if r.requeue => schedule(id, r.requeue_after),
//!     _ => {}
//! }
//! ```
//!
//! Secret change events are mapped back to instances with
//! [`DependencyIndex::affected_by`].

pub mod batch;
pub mod cancel;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod index;
pub mod lifecycle;
pub mod reconciler;
pub mod retry;
pub mod types;
pub mod workload;

#[cfg(test)]
mod testing;

pub use batch::{BatchSummary, InstanceOutcome};
pub use cancel::CancelToken;
pub use collaborators::{
    AppliedResource, Collaborators, ConfigBundle, ConfigWriter, NetworkAttachmentOracle,
    NetworkStatus, ResourceApplier, ResourceSpec, SecretProvider, StateStore, TlsValidator,
    WorkloadBuilder, WorkloadInput,
};
pub use config::ReconcilerConfig;
pub use error::{Error, ErrorCategory, Result};
pub use index::DependencyIndex;
pub use reconciler::{Flow, ReconcileResult, Reconciler, Requeue};
pub use retry::RetryConfig;
pub use types::{Instance, InstanceId, ObjectMeta, Secret, TlsSpec, VolumeSpec, VolumeStatus};
pub use workload::StatefulSetBuilder;
