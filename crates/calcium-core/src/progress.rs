use crate::engine::{PopulateSummary, TriggerOutcome};
use crate::storage::models::ProcessingTaskKey;

/// Trait for reporting populate progress.
///
/// The CLI implements it with indicatif. All methods have default no-op
/// implementations.
pub trait PopulateReporter: Send + Sync {
    fn on_populate_start(&self, _pending_tasks: usize) {}
    fn on_task_checked(&self, _key: &ProcessingTaskKey, _outcome: &TriggerOutcome) {}
    fn on_populate_complete(&self, _summary: &PopulateSummary, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl PopulateReporter for SilentReporter {}
