use super::models::*;
use super::sqlite::Database;
use crate::blob;
use crate::error::Error;
use rusqlite::params;
use tracing::debug;

impl Database {
    // ── Fluorescence ─────────────────────────────────────────────

    pub fn insert_fluorescence(
        &self,
        key: &ProcessingTaskKey,
        traces: &[Trace],
    ) -> Result<usize, Error> {
        let instance = key.instance_text();
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO fluorescence (scan_id, processing_instance) VALUES (?1, ?2)",
            params![key.scan_id, instance],
        )?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO fluorescence_trace \
                 (scan_id, processing_instance, mask_id, roi_channel, fluo, neuropil_fluo) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for trace in traces {
                count += stmt.execute(params![
                    key.scan_id,
                    instance,
                    trace.mask_id,
                    trace.roi_channel,
                    blob::encode(&trace.fluo)?,
                    blob::encode(&trace.neuropil_fluo)?,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Inserted {} fluorescence traces for {}", count, key);
        Ok(count)
    }

    pub fn get_traces(&self, key: &ProcessingTaskKey) -> Result<Vec<Trace>, Error> {
        let mut stmt = self.connection().prepare(
            "SELECT mask_id, roi_channel, fluo, neuropil_fluo FROM fluorescence_trace \
             WHERE scan_id = ?1 AND processing_instance = ?2 \
             ORDER BY mask_id, roi_channel",
        )?;
        let rows = stmt
            .query_map(params![key.scan_id, key.instance_text()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(mask_id, roi_channel, fluo, neuropil_fluo)| {
                Ok(Trace {
                    mask_id,
                    roi_channel,
                    fluo: blob::decode(&fluo)?,
                    neuropil_fluo: blob::decode(&neuropil_fluo)?,
                })
            })
            .collect()
    }

    // ── Deconvolved activity ─────────────────────────────────────

    pub fn insert_deconvolution(&self, key: &ProcessingTaskKey, dffs: &[Dff]) -> Result<usize, Error> {
        let instance = key.instance_text();
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO deconvolved_activity (scan_id, processing_instance) VALUES (?1, ?2)",
            params![key.scan_id, instance],
        )?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO dff (scan_id, processing_instance, mask_id, roi_channel, df_f) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for dff in dffs {
                count += stmt.execute(params![
                    key.scan_id,
                    instance,
                    dff.mask_id,
                    dff.roi_channel,
                    blob::encode(&dff.df_f)?,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Inserted {} deconvolved traces for {}", count, key);
        Ok(count)
    }

    pub fn get_dff(&self, key: &ProcessingTaskKey) -> Result<Vec<Dff>, Error> {
        let mut stmt = self.connection().prepare(
            "SELECT mask_id, roi_channel, df_f FROM dff \
             WHERE scan_id = ?1 AND processing_instance = ?2 \
             ORDER BY mask_id, roi_channel",
        )?;
        let rows = stmt
            .query_map(params![key.scan_id, key.instance_text()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(mask_id, roi_channel, df_f)| {
                Ok(Dff {
                    mask_id,
                    roi_channel,
                    df_f: blob::decode(&df_f)?,
                })
            })
            .collect()
    }
}
