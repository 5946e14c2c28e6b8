//! Parallel reconciliation of many instances

use rayon::prelude::*;
use std::collections::BTreeSet;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::reconciler::{ReconcileResult, Reconciler};
use crate::types::InstanceId;

/// Outcome for one instance of a batch
#[derive(Debug)]
pub struct InstanceOutcome {
    pub id: InstanceId,
    pub result: Result<ReconcileResult>,
}

impl InstanceOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-batch counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub done: usize,
    pub requeued: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[InstanceOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match &outcome.result {
                Ok(r) if r.requeue => summary.requeued += 1,
                Ok(_) => summary.done += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Drop repeated ids, keeping first-appearance order
fn distinct(ids: &[InstanceId]) -> Vec<&InstanceId> {
    let mut seen = BTreeSet::new();
    ids.iter().filter(|id| seen.insert(*id)).collect()
}

impl Reconciler {
    /// Reconcile each distinct instance once, `config.jobs` at a time.
    ///
    /// An instance never runs concurrently with itself. Outcomes are
    /// returned in first-appearance order of the ids.
    pub fn reconcile_many(
        &self,
        ids: &[InstanceId],
        cancel: &CancelToken,
    ) -> Result<Vec<InstanceOutcome>> {
        let ids = distinct(ids);
        let jobs = self.config().jobs.max(1);

        let outcomes = if jobs == 1 || ids.len() <= 1 {
            ids.into_iter()
                .map(|id| self.outcome(id, cancel))
                .collect::<Vec<_>>()
        } else {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
            pool.install(|| {
                ids.par_iter()
                    .map(|id| self.outcome(id, cancel))
                    .collect::<Vec<_>>()
            })
        };

        let summary = BatchSummary::from_outcomes(&outcomes);
        log::info!(
            "Reconciled {} instance(s): {} done, {} requeued, {} failed",
            outcomes.len(),
            summary.done,
            summary.requeued,
            summary.failed
        );
        Ok(outcomes)
    }

    fn outcome(&self, id: &InstanceId, cancel: &CancelToken) -> InstanceOutcome {
        InstanceOutcome {
            id: id.clone(),
            result: self.reconcile_with(id, cancel),
        }
    }
}
