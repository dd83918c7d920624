use crate::config::AppConfig;
use crate::error::Error;
use crate::lookup::ProcessingMethod;
use crate::progress::PopulateReporter;
use crate::resolver::Resolvers;
use crate::scanner;
use crate::storage::models::ProcessingTaskKey;
use crate::storage::Database;
use glob::Pattern;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Watches for external processing output and records completion.
pub struct ProcessingEngine {
    db: Database,
    resolvers: Resolvers,
    root_data_dir: PathBuf,
    output_patterns: Vec<Pattern>,
}

/// Result of evaluating one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The output directory is not there yet. Nothing was written.
    Pending,
    /// A Processing row was inserted with this many output files.
    Completed { files: usize },
    /// The task already had a Processing row. Nothing was written.
    AlreadyComplete,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PopulateSummary {
    pub tasks_checked: usize,
    pub tasks_completed: usize,
    pub tasks_pending: usize,
    pub files_registered: usize,
}

impl ProcessingEngine {
    pub fn new(db: Database, resolvers: Resolvers, root_data_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            resolvers,
            root_data_dir: root_data_dir.into(),
            output_patterns: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let db = Database::open(&config.database_path)?;
        Self::new(db, Resolvers::from_config(config), &config.root_data_dir)
            .with_output_patterns(&config.output_patterns)
    }

    /// Restrict which file names count as output. With no patterns every
    /// regular file does.
    pub fn with_output_patterns(mut self, globs: &[String]) -> Result<Self, Error> {
        self.output_patterns = scanner::compile_patterns(globs)?;
        Ok(self)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Register a processing request for a scan with a chosen parameter set.
    /// Only foreign keys are checked: the scan and parameter set must exist.
    pub fn register_task(
        &self,
        key: &ProcessingTaskKey,
        method: ProcessingMethod,
        paramset_idx: i64,
    ) -> Result<(), Error> {
        self.db.insert_processing_task(key, method, paramset_idx)?;
        info!(
            "Registered {} with {} parameter set {}",
            key, method, paramset_idx
        );
        Ok(())
    }

    /// Evaluate one task:
    /// 1. Resolve its processing method (unknown methods fail before any write)
    /// 2. Resolve the expected output directory for that method
    /// 3. If the directory exists, record completion and its output files
    pub fn trigger(&self, key: &ProcessingTaskKey) -> Result<TriggerOutcome, Error> {
        let task = self
            .db
            .get_processing_task(key)?
            .ok_or(Error::TaskNotFound(*key))?;
        let method: ProcessingMethod = task.processing_method.parse()?;

        if self.db.processing_exists(key)? {
            debug!("{} already complete", key);
            return Ok(TriggerOutcome::AlreadyComplete);
        }

        let Some(output_dir) = self.resolvers.for_method(method).output_dir(key) else {
            debug!("{} output directory not resolvable yet", method);
            return Ok(TriggerOutcome::Pending);
        };
        if !output_dir.is_dir() {
            debug!(
                "{} output directory {} does not exist yet",
                method,
                output_dir.display()
            );
            return Ok(TriggerOutcome::Pending);
        }

        let files =
            scanner::collect_output_files(&output_dir, &self.root_data_dir, &self.output_patterns)?;
        let relative: Vec<String> = files
            .into_iter()
            .map(|f| {
                trace!("Output file {} -> {}", f.absolute.display(), f.relative);
                f.relative
            })
            .collect();
        let processing_time = chrono::Utc::now().to_rfc3339();
        let count = self.db.insert_processing(key, &processing_time, &relative)?;

        info!(
            "{} complete: {} output files from {}",
            key,
            count,
            output_dir.display()
        );
        Ok(TriggerOutcome::Completed { files: count })
    }

    /// Trigger every pending task in key order. Stops at the first error.
    pub fn populate(&self, reporter: &dyn PopulateReporter) -> Result<PopulateSummary, Error> {
        let start = Instant::now();
        let pending = self.db.list_pending_tasks()?;
        reporter.on_populate_start(pending.len());
        info!("Checking {} pending tasks...", pending.len());

        let mut summary = PopulateSummary::default();
        for task in pending {
            let outcome = self.trigger(&task.key)?;
            summary.tasks_checked += 1;
            match outcome {
                TriggerOutcome::Completed { files } => {
                    summary.tasks_completed += 1;
                    summary.files_registered += files;
                }
                TriggerOutcome::Pending => summary.tasks_pending += 1,
                TriggerOutcome::AlreadyComplete => {}
            }
            reporter.on_task_checked(&task.key, &outcome);
        }

        let duration = start.elapsed();
        debug!(
            "Populate completed in {:.2}s: {:?}",
            duration.as_secs_f64(),
            summary
        );
        reporter.on_populate_complete(&summary, duration.as_secs_f64());
        Ok(summary)
    }
}
