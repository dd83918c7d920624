use super::models::*;
use super::sqlite::{optional, Database};
use rusqlite::types::Type;
use rusqlite::{params, Result};
use serde_json::Value;
use tracing::debug;

impl Database {
    // ── Scans ────────────────────────────────────────────────────

    pub fn insert_scan(&self, scan: &Scan) -> Result<()> {
        self.connection().execute(
            "INSERT INTO scan (scan_id, scan_path, description) VALUES (?1, ?2, ?3)",
            params![scan.scan_id, scan.scan_path, scan.description],
        )?;
        debug!("Inserted scan {}", scan.scan_id);
        Ok(())
    }

    /// Insert a scan with its fields and channels in one transaction.
    pub fn insert_scan_with_layout(
        &self,
        scan: &Scan,
        fields: &[ScanField],
        channels: &[i64],
    ) -> Result<()> {
        let tx = self.connection().unchecked_transaction()?;
        self.insert_scan(scan)?;
        for field in fields {
            self.insert_scan_field(field)?;
        }
        for &channel in channels {
            self.insert_scan_channel(scan.scan_id, channel)?;
        }
        tx.commit()
    }

    pub fn get_scan(&self, scan_id: i64) -> Result<Option<Scan>> {
        optional(self.connection().query_row(
            "SELECT scan_id, scan_path, description FROM scan WHERE scan_id = ?1",
            params![scan_id],
            |row| {
                Ok(Scan {
                    scan_id: row.get(0)?,
                    scan_path: row.get(1)?,
                    description: row.get(2)?,
                })
            },
        ))
    }

    /// Delete a scan. Fields, channels, tasks and every downstream result
    /// cascade with it.
    pub fn delete_scan(&self, scan_id: i64) -> Result<usize> {
        let deleted = self
            .connection()
            .execute("DELETE FROM scan WHERE scan_id = ?1", params![scan_id])?;
        debug!("Deleted scan {} ({} rows)", scan_id, deleted);
        Ok(deleted)
    }

    pub fn insert_scan_field(&self, field: &ScanField) -> Result<()> {
        self.connection().execute(
            "INSERT INTO scan_field (scan_id, field_idx, px_height, px_width) \
             VALUES (?1, ?2, ?3, ?4)",
            params![field.scan_id, field.field_idx, field.px_height, field.px_width],
        )?;
        Ok(())
    }

    pub fn get_scan_fields(&self, scan_id: i64) -> Result<Vec<ScanField>> {
        let mut stmt = self.connection().prepare(
            "SELECT scan_id, field_idx, px_height, px_width FROM scan_field \
             WHERE scan_id = ?1 ORDER BY field_idx",
        )?;
        let fields = stmt
            .query_map(params![scan_id], |row| {
                Ok(ScanField {
                    scan_id: row.get(0)?,
                    field_idx: row.get(1)?,
                    px_height: row.get(2)?,
                    px_width: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(fields)
    }

    pub fn insert_scan_channel(&self, scan_id: i64, channel: i64) -> Result<()> {
        self.connection().execute(
            "INSERT INTO scan_channel (scan_id, channel) VALUES (?1, ?2)",
            params![scan_id, channel],
        )?;
        Ok(())
    }

    pub fn get_scan_channels(&self, scan_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT channel FROM scan_channel WHERE scan_id = ?1 ORDER BY channel")?;
        let channels = stmt
            .query_map(params![scan_id], |row| row.get(0))?
            .collect::<Result<Vec<_>>>()?;
        Ok(channels)
    }

    // ── Method-specific parameters ───────────────────────────────

    pub fn insert_caiman_params(&self, params: &Value) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO caiman_paramset (params) VALUES (?1)",
            params![params.to_string()],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    pub fn insert_suite2p_params(&self, params: &Value) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO suite2p_paramset (params) VALUES (?1)",
            params![params.to_string()],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    /// Tool parameters referenced by a parameter set.
    pub fn get_specialized_params(
        &self,
        specialization: &ParamSetSpecialization,
    ) -> Result<Option<Value>> {
        let (sql, id) = match specialization {
            ParamSetSpecialization::Caiman { caiman_paramset_id } => (
                "SELECT params FROM caiman_paramset WHERE caiman_paramset_id = ?1",
                *caiman_paramset_id,
            ),
            ParamSetSpecialization::Suite2p { suite2p_paramset_id } => (
                "SELECT params FROM suite2p_paramset WHERE suite2p_paramset_id = ?1",
                *suite2p_paramset_id,
            ),
        };
        optional(self.connection().query_row(sql, params![id], |row| {
            let text: String = row.get(0)?;
            serde_json::from_str(&text)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
        }))
    }

    // ── Lookups ──────────────────────────────────────────────────

    /// Values stored in a lookup table, in insertion order.
    pub fn lookup_values(&self, table: LookupTable) -> Result<Vec<String>> {
        let column = table.as_str();
        let mut stmt = self
            .connection()
            .prepare(&format!("SELECT {0} FROM {0} ORDER BY rowid", column))?;
        let values = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>>>()?;
        Ok(values)
    }
}

/// Seeded lookup tables. Each table's single column shares its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTable {
    ProcessingMethod,
    CellCompartment,
    RoiType,
}

impl LookupTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupTable::ProcessingMethod => "processing_method",
            LookupTable::CellCompartment => "cell_compartment",
            LookupTable::RoiType => "roi_type",
        }
    }
}
