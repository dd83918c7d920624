use super::models::*;
use super::sqlite::{optional, Database};
use crate::lookup::ProcessingMethod;
use rusqlite::types::Type;
use rusqlite::{params, Result, Row};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

const TASK_COLUMNS: &str =
    "t.scan_id, t.processing_instance, t.processing_method, t.paramset_idx";

fn parse_instance(text: &str, column: usize) -> Result<Uuid> {
    Uuid::parse_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

/// Reads the four `TASK_COLUMNS`, in order, starting at column 0.
fn task_from_row(row: &Row<'_>) -> Result<ProcessingTask> {
    let instance: String = row.get(1)?;
    Ok(ProcessingTask {
        key: ProcessingTaskKey::new(row.get(0)?, parse_instance(&instance, 1)?),
        processing_method: row.get(2)?,
        paramset_idx: row.get(3)?,
    })
}

impl Database {
    // ── Parameter sets ───────────────────────────────────────────

    /// Insert a parameter set and its method-specific specialization row.
    pub fn insert_param_set(&self, param_set: &ParamSet) -> Result<()> {
        let tx = self.connection().unchecked_transaction()?;
        self.insert_param_set_rows(param_set)?;
        tx.commit()
    }

    /// Store the tool parameters and the parameter set referencing them in
    /// one transaction.
    pub fn insert_param_set_with_params(
        &self,
        method: ProcessingMethod,
        paramset_idx: i64,
        paramset_desc: &str,
        params: &Value,
    ) -> Result<ParamSet> {
        let tx = self.connection().unchecked_transaction()?;
        let specialization = match method {
            ProcessingMethod::Suite2p => ParamSetSpecialization::Suite2p {
                suite2p_paramset_id: self.insert_suite2p_params(params)?,
            },
            ProcessingMethod::Caiman => ParamSetSpecialization::Caiman {
                caiman_paramset_id: self.insert_caiman_params(params)?,
            },
        };
        let param_set = ParamSet {
            paramset_idx,
            paramset_desc: paramset_desc.to_string(),
            specialization,
        };
        self.insert_param_set_rows(&param_set)?;
        tx.commit()?;
        Ok(param_set)
    }

    fn insert_param_set_rows(&self, param_set: &ParamSet) -> Result<()> {
        let method = param_set.method().as_str();
        let conn = self.connection();
        conn.execute(
            "INSERT INTO processing_paramset (processing_method, paramset_idx, paramset_desc) \
             VALUES (?1, ?2, ?3)",
            params![method, param_set.paramset_idx, param_set.paramset_desc],
        )?;
        match param_set.specialization {
            ParamSetSpecialization::Caiman { caiman_paramset_id } => conn.execute(
                "INSERT INTO processing_paramset_caiman \
                 (processing_method, paramset_idx, caiman_paramset_id) VALUES (?1, ?2, ?3)",
                params![method, param_set.paramset_idx, caiman_paramset_id],
            )?,
            ParamSetSpecialization::Suite2p { suite2p_paramset_id } => conn.execute(
                "INSERT INTO processing_paramset_suite2p \
                 (processing_method, paramset_idx, suite2p_paramset_id) VALUES (?1, ?2, ?3)",
                params![method, param_set.paramset_idx, suite2p_paramset_id],
            )?,
        };
        debug!("Inserted {} parameter set {}", method, param_set.paramset_idx);
        Ok(())
    }

    pub fn get_param_set(
        &self,
        method: ProcessingMethod,
        paramset_idx: i64,
    ) -> Result<Option<ParamSet>> {
        Ok(self
            .list_param_sets()?
            .into_iter()
            .find(|p| p.method() == method && p.paramset_idx == paramset_idx))
    }

    /// All parameter sets with a recognized specialization.
    pub fn list_param_sets(&self) -> Result<Vec<ParamSet>> {
        let mut stmt = self.connection().prepare(
            "SELECT p.paramset_idx, p.paramset_desc, c.caiman_paramset_id, s.suite2p_paramset_id \
             FROM processing_paramset p \
             LEFT JOIN processing_paramset_caiman c \
                 ON c.processing_method = p.processing_method \
                 AND c.paramset_idx = p.paramset_idx \
             LEFT JOIN processing_paramset_suite2p s \
                 ON s.processing_method = p.processing_method \
                 AND s.paramset_idx = p.paramset_idx \
             ORDER BY p.processing_method, p.paramset_idx",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(paramset_idx, paramset_desc, caiman, suite2p)| {
                let specialization = match (caiman, suite2p) {
                    (Some(caiman_paramset_id), _) => {
                        ParamSetSpecialization::Caiman { caiman_paramset_id }
                    }
                    (None, Some(suite2p_paramset_id)) => {
                        ParamSetSpecialization::Suite2p { suite2p_paramset_id }
                    }
                    (None, None) => return None,
                };
                Some(ParamSet {
                    paramset_idx,
                    paramset_desc,
                    specialization,
                })
            })
            .collect())
    }

    // ── Processing tasks ─────────────────────────────────────────

    pub fn insert_processing_task(
        &self,
        key: &ProcessingTaskKey,
        method: ProcessingMethod,
        paramset_idx: i64,
    ) -> Result<()> {
        self.connection().execute(
            "INSERT INTO processing_task \
             (scan_id, processing_instance, processing_method, paramset_idx) \
             VALUES (?1, ?2, ?3, ?4)",
            params![key.scan_id, key.instance_text(), method.as_str(), paramset_idx],
        )?;
        debug!("Registered processing task {}", key);
        Ok(())
    }

    pub fn get_processing_task(&self, key: &ProcessingTaskKey) -> Result<Option<ProcessingTask>> {
        optional(self.connection().query_row(
            &format!(
                "SELECT {} FROM processing_task t \
                 WHERE t.scan_id = ?1 AND t.processing_instance = ?2",
                TASK_COLUMNS
            ),
            params![key.scan_id, key.instance_text()],
            task_from_row,
        ))
    }

    pub fn list_processing_tasks(&self) -> Result<Vec<ProcessingTask>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM processing_task t \
             ORDER BY t.scan_id, t.processing_instance",
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Tasks with no Processing row yet.
    pub fn list_pending_tasks(&self) -> Result<Vec<ProcessingTask>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM processing_task t \
             LEFT JOIN processing p \
                 ON p.scan_id = t.scan_id AND p.processing_instance = t.processing_instance \
             WHERE p.scan_id IS NULL \
             ORDER BY t.scan_id, t.processing_instance",
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// `None` when the task itself does not exist.
    pub fn task_status(&self, key: &ProcessingTaskKey) -> Result<Option<TaskStatus>> {
        if self.get_processing_task(key)?.is_none() {
            return Ok(None);
        }
        Ok(Some(if self.processing_exists(key)? {
            TaskStatus::Complete
        } else {
            TaskStatus::Pending
        }))
    }

    pub fn list_task_summaries(&self) -> Result<Vec<TaskSummary>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {}, p.processing_time, \
                    (SELECT COUNT(*) FROM processing_output_file f \
                     WHERE f.scan_id = t.scan_id \
                     AND f.processing_instance = t.processing_instance) \
             FROM processing_task t \
             LEFT JOIN processing p \
                 ON p.scan_id = t.scan_id AND p.processing_instance = t.processing_instance \
             ORDER BY t.scan_id, t.processing_instance",
            TASK_COLUMNS
        ))?;
        let summaries = stmt
            .query_map([], |row| {
                Ok(TaskSummary {
                    task: task_from_row(row)?,
                    processing_time: row.get(4)?,
                    output_file_count: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(summaries)
    }

    // ── Processing ───────────────────────────────────────────────

    pub fn processing_exists(&self, key: &ProcessingTaskKey) -> Result<bool> {
        self.task_row_exists("processing", key)
    }

    /// Record completion of a task together with its output files, all in one
    /// transaction. `file_paths` are relative to the root data directory.
    pub fn insert_processing(
        &self,
        key: &ProcessingTaskKey,
        processing_time: &str,
        file_paths: &[String],
    ) -> Result<usize> {
        let instance = key.instance_text();
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO processing (scan_id, processing_instance, processing_time) \
             VALUES (?1, ?2, ?3)",
            params![key.scan_id, instance, processing_time],
        )?;
        let mut count = 0;
        {
            let mut file_stmt =
                tx.prepare_cached("INSERT OR IGNORE INTO physical_file (file_path) VALUES (?1)")?;
            let mut output_stmt = tx.prepare_cached(
                "INSERT INTO processing_output_file (scan_id, processing_instance, file_path) \
                 VALUES (?1, ?2, ?3)",
            )?;
            for path in file_paths {
                file_stmt.execute(params![path])?;
                count += output_stmt.execute(params![key.scan_id, instance, path])?;
            }
        }
        tx.commit()?;
        debug!("Inserted processing for {} with {} output files", key, count);
        Ok(count)
    }

    pub fn get_processing(&self, key: &ProcessingTaskKey) -> Result<Option<Processing>> {
        let processing_time: Option<String> = optional(self.connection().query_row(
            "SELECT processing_time FROM processing \
             WHERE scan_id = ?1 AND processing_instance = ?2",
            params![key.scan_id, key.instance_text()],
            |row| row.get(0),
        ))?;
        let Some(processing_time) = processing_time else {
            return Ok(None);
        };

        let mut stmt = self.connection().prepare(
            "SELECT file_path FROM processing_output_file \
             WHERE scan_id = ?1 AND processing_instance = ?2 ORDER BY file_path",
        )?;
        let output_files = stmt
            .query_map(params![key.scan_id, key.instance_text()], |row| row.get(0))?
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Processing {
            key: *key,
            processing_time,
            output_files,
        }))
    }
}
