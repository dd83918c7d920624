use rusqlite::{params, Connection, Result};
use tracing::debug;

use super::models::ProcessingTaskKey;

/// Ordered schema migrations. `PRAGMA user_version` records how many have run.
const MIGRATIONS: &[&str] = &[include_str!("migrations/0001_initial.sql")];

/// Non-lookup tables, children before parents.
const DATA_TABLES: &[&str] = &[
    "dff",
    "deconvolved_activity",
    "fluorescence_trace",
    "fluorescence",
    "mask_type",
    "mask_classification",
    "segmentation_mask",
    "segmentation",
    "motion_corrected_images",
    "motion_block",
    "nonrigid_motion_correction",
    "rigid_motion_correction",
    "motion_correction",
    "processing_output_file",
    "processing",
    "processing_task",
    "processing_paramset_suite2p",
    "processing_paramset_caiman",
    "processing_paramset",
    "suite2p_paramset",
    "caiman_paramset",
    "physical_file",
    "scan_channel",
    "scan_field",
    "scan",
];

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -64000;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, foreign keys on)");
        Ok(())
    }

    /// Apply every migration newer than the stored schema version, each in its
    /// own transaction.
    fn migrate_schema(&self) -> Result<()> {
        let version = self.schema_version()?;

        for (idx, script) in MIGRATIONS.iter().enumerate().skip(version as usize) {
            let tx = self.conn.unchecked_transaction()?;
            tx.execute_batch(script)?;
            tx.execute_batch(&format!("PRAGMA user_version = {}", idx + 1))?;
            tx.commit()?;
            debug!("Applied schema migration {}", idx + 1);
        }

        debug!("SQLite schema at version {}", MIGRATIONS.len());
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Delete every row except the seeded lookup tables.
    pub fn truncate_all(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for table in DATA_TABLES {
            tx.execute(&format!("DELETE FROM {}", table), [])?;
        }
        tx.commit()?;
        debug!("All data tables truncated");
        Ok(())
    }

    /// Whether `table` holds a row keyed by this task.
    pub(crate) fn task_row_exists(&self, table: &str, key: &ProcessingTaskKey) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE scan_id = ?1 AND processing_instance = ?2",
                table
            ),
            params![key.scan_id, key.instance_text()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count_rows(&self, table: &str) -> Result<i64> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
    }
}

/// Map `QueryReturnedNoRows` to `None`.
pub(crate) fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}
