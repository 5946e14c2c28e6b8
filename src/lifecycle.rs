//! Finalizer handling
//!
//! An instance carries the reconciler's finalizer for as long as it exists,
//! so deletion waits until the reconciler has seen it.

use crate::types::ObjectMeta;

/// What an invocation does, decided before any phase runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    /// Deletion requested; finalizer removed, nothing else runs
    Delete,
    /// Finalizer just added or status never written; persist and return
    Register,
    /// Run the phases
    Converge,
}

/// Add `finalizer` if absent. Returns true if the list changed.
pub fn add_finalizer(finalizers: &mut Vec<String>, finalizer: &str) -> bool {
    if finalizers.iter().any(|f| f == finalizer) {
        return false;
    }
    finalizers.push(finalizer.to_string());
    true
}

/// Remove every occurrence of `finalizer`. Returns true if the list changed.
pub fn remove_finalizer(finalizers: &mut Vec<String>, finalizer: &str) -> bool {
    let before = finalizers.len();
    finalizers.retain(|f| f != finalizer);
    finalizers.len() != before
}

/// Decides the lifecycle step and applies finalizer changes to metadata.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleGuard<'a> {
    finalizer: &'a str,
}

impl<'a> LifecycleGuard<'a> {
    pub fn new(finalizer: &'a str) -> Self {
        Self { finalizer }
    }

    /// Decide the step for an instance.
    ///
    /// Deletion is checked first and always wins. `first_observation` is
    /// true when the instance has no recorded status yet.
    pub fn step(&self, metadata: &mut ObjectMeta, first_observation: bool) -> LifecycleStep {
        if metadata.is_deleting() {
            if remove_finalizer(&mut metadata.finalizers, self.finalizer) {
                log::info!("Removed finalizer from '{}'", metadata.name);
            }
            return LifecycleStep::Delete;
        }

        let added = add_finalizer(&mut metadata.finalizers, self.finalizer);
        if added {
            log::debug!("Added finalizer to '{}'", metadata.name);
        }

        if added || first_observation {
            LifecycleStep::Register
        } else {
            LifecycleStep::Converge
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const FINALIZER: &str = "openstack.org/cindervolume";

    fn meta(finalizers: &[&str]) -> ObjectMeta {
        ObjectMeta {
            name: "cinder-volume-lvm".into(),
            namespace: "openstack".into(),
            finalizers: finalizers.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_and_remove() {
        let mut finalizers = vec!["other".to_string()];
        assert!(add_finalizer(&mut finalizers, FINALIZER));
        assert!(!add_finalizer(&mut finalizers, FINALIZER));
        assert_eq!(finalizers, vec!["other", FINALIZER]);
        assert!(remove_finalizer(&mut finalizers, FINALIZER));
        assert!(!remove_finalizer(&mut finalizers, FINALIZER));
        assert_eq!(finalizers, vec!["other"]);
    }

    #[test]
    fn test_new_instance_registers() {
        let mut m = meta(&[]);
        let step = LifecycleGuard::new(FINALIZER).step(&mut m, true);
        assert_eq!(step, LifecycleStep::Register);
        assert!(m.has_finalizer(FINALIZER));
    }

    #[test]
    fn test_missing_finalizer_registers_even_with_status() {
        let mut m = meta(&[]);
        assert_eq!(
            LifecycleGuard::new(FINALIZER).step(&mut m, false),
            LifecycleStep::Register
        );
    }

    #[test]
    fn test_first_observation_with_finalizer_registers() {
        let mut m = meta(&[FINALIZER]);
        assert_eq!(
            LifecycleGuard::new(FINALIZER).step(&mut m, true),
            LifecycleStep::Register
        );
        assert_eq!(m.finalizers.len(), 1);
    }

    #[test]
    fn test_converge() {
        let mut m = meta(&[FINALIZER]);
        assert_eq!(
            LifecycleGuard::new(FINALIZER).step(&mut m, false),
            LifecycleStep::Converge
        );
    }

    #[test]
    fn test_deletion_wins_and_removes_finalizer() {
        let mut m = meta(&["other", FINALIZER]);
        m.deletion_timestamp = Some(Utc::now());
        assert_eq!(
            LifecycleGuard::new(FINALIZER).step(&mut m, true),
            LifecycleStep::Delete
        );
        assert_eq!(m.finalizers, vec!["other"]);
    }
}
