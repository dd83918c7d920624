use super::models::*;
use super::sqlite::{optional, Database};
use crate::blob::{self, Image};
use crate::error::Error;
use rusqlite::params;
use tracing::debug;

impl Database {
    /// Insert a motion correction with all its per-field rows and blocks in
    /// one transaction.
    pub fn insert_motion_correction(&self, mc: &MotionCorrection) -> Result<(), Error> {
        let scan_id = mc.key.scan_id;
        let instance = mc.key.instance_text();
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO motion_correction (scan_id, processing_instance, mc_channel) \
             VALUES (?1, ?2, ?3)",
            params![scan_id, instance, mc.mc_channel],
        )?;
        let mut block_count = 0;
        {
            let mut rigid_stmt = tx.prepare_cached(
                "INSERT INTO rigid_motion_correction \
                 (scan_id, processing_instance, field_idx, ref_image, outlier_frames, \
                  y_shifts, x_shifts, y_std, x_std) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            let mut nonrigid_stmt = tx.prepare_cached(
                "INSERT INTO nonrigid_motion_correction \
                 (scan_id, processing_instance, field_idx, ref_image, outlier_frames, \
                  block_height, block_width, block_count_y, block_count_x) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            let mut block_stmt = tx.prepare_cached(
                "INSERT INTO motion_block \
                 (scan_id, processing_instance, field_idx, block_id, \
                  block_y_start, block_y_end, block_x_start, block_x_end, \
                  y_shifts, x_shifts, y_std, x_std) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;

            for field in &mc.fields {
                match &field.correction {
                    FieldCorrection::Rigid(rigid) => {
                        rigid_stmt.execute(params![
                            scan_id,
                            instance,
                            field.field_idx,
                            blob::encode(&rigid.ref_image)?,
                            blob::encode(&rigid.outlier_frames)?,
                            blob::encode(&rigid.y_shifts)?,
                            blob::encode(&rigid.x_shifts)?,
                            rigid.y_std,
                            rigid.x_std,
                        ])?;
                    }
                    FieldCorrection::NonRigid(nonrigid) => {
                        nonrigid_stmt.execute(params![
                            scan_id,
                            instance,
                            field.field_idx,
                            blob::encode(&nonrigid.ref_image)?,
                            blob::encode(&nonrigid.outlier_frames)?,
                            nonrigid.block_height,
                            nonrigid.block_width,
                            nonrigid.block_count_y,
                            nonrigid.block_count_x,
                        ])?;
                        for block in &nonrigid.blocks {
                            block_stmt.execute(params![
                                scan_id,
                                instance,
                                field.field_idx,
                                block.block_id,
                                block.block_y.0,
                                block.block_y.1,
                                block.block_x.0,
                                block.block_x.1,
                                blob::encode(&block.y_shifts)?,
                                blob::encode(&block.x_shifts)?,
                                block.y_std,
                                block.x_std,
                            ])?;
                            block_count += 1;
                        }
                    }
                }
            }
        }
        tx.commit()?;
        debug!(
            "Inserted motion correction for {}: {} fields, {} blocks",
            mc.key,
            mc.fields.len(),
            block_count
        );
        Ok(())
    }

    pub fn get_motion_correction(
        &self,
        key: &ProcessingTaskKey,
    ) -> Result<Option<MotionCorrection>, Error> {
        let instance = key.instance_text();
        let mc_channel: Option<i64> = optional(self.connection().query_row(
            "SELECT mc_channel FROM motion_correction \
             WHERE scan_id = ?1 AND processing_instance = ?2",
            params![key.scan_id, instance],
            |row| row.get(0),
        ))?;
        let Some(mc_channel) = mc_channel else {
            return Ok(None);
        };

        let mut fields = Vec::new();

        let mut stmt = self.connection().prepare(
            "SELECT field_idx, ref_image, outlier_frames, y_shifts, x_shifts, y_std, x_std \
             FROM rigid_motion_correction \
             WHERE scan_id = ?1 AND processing_instance = ?2",
        )?;
        let rigid_rows = stmt
            .query_map(params![key.scan_id, instance], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (field_idx, ref_image, outliers, y_shifts, x_shifts, y_std, x_std) in rigid_rows {
            fields.push(FieldMotion {
                field_idx,
                correction: FieldCorrection::Rigid(RigidShifts {
                    ref_image: blob::decode(&ref_image)?,
                    outlier_frames: blob::decode(&outliers)?,
                    y_shifts: blob::decode(&y_shifts)?,
                    x_shifts: blob::decode(&x_shifts)?,
                    y_std,
                    x_std,
                }),
            });
        }

        let mut stmt = self.connection().prepare(
            "SELECT field_idx, ref_image, outlier_frames, \
                    block_height, block_width, block_count_y, block_count_x \
             FROM nonrigid_motion_correction \
             WHERE scan_id = ?1 AND processing_instance = ?2",
        )?;
        let nonrigid_rows = stmt
            .query_map(params![key.scan_id, instance], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (field_idx, ref_image, outliers, height, width, count_y, count_x) in nonrigid_rows {
            fields.push(FieldMotion {
                field_idx,
                correction: FieldCorrection::NonRigid(NonRigidShifts {
                    ref_image: blob::decode(&ref_image)?,
                    outlier_frames: blob::decode(&outliers)?,
                    block_height: height,
                    block_width: width,
                    block_count_y: count_y,
                    block_count_x: count_x,
                    blocks: self.get_motion_blocks(key, field_idx)?,
                }),
            });
        }

        fields.sort_by_key(|f| f.field_idx);
        Ok(Some(MotionCorrection {
            key: *key,
            mc_channel,
            fields,
        }))
    }

    fn get_motion_blocks(
        &self,
        key: &ProcessingTaskKey,
        field_idx: i64,
    ) -> Result<Vec<MotionBlock>, Error> {
        let mut stmt = self.connection().prepare(
            "SELECT block_id, block_y_start, block_y_end, block_x_start, block_x_end, \
                    y_shifts, x_shifts, y_std, x_std \
             FROM motion_block \
             WHERE scan_id = ?1 AND processing_instance = ?2 AND field_idx = ?3 \
             ORDER BY block_id",
        )?;
        let rows = stmt
            .query_map(params![key.scan_id, key.instance_text(), field_idx], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    (row.get::<_, i64>(1)?, row.get::<_, i64>(2)?),
                    (row.get::<_, i64>(3)?, row.get::<_, i64>(4)?),
                    row.get::<_, Vec<u8>>(5)?,
                    row.get::<_, Vec<u8>>(6)?,
                    row.get::<_, f64>(7)?,
                    row.get::<_, f64>(8)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(block_id, block_y, block_x, y_shifts, x_shifts, y_std, x_std)| {
                Ok(MotionBlock {
                    block_id,
                    block_y,
                    block_x,
                    y_shifts: blob::decode(&y_shifts)?,
                    x_shifts: blob::decode(&x_shifts)?,
                    y_std,
                    x_std,
                })
            })
            .collect()
    }

    // ── Summary images ───────────────────────────────────────────

    pub fn insert_corrected_images(
        &self,
        key: &ProcessingTaskKey,
        images: &[CorrectedImages],
    ) -> Result<usize, Error> {
        let instance = key.instance_text();
        let tx = self.connection().unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO motion_corrected_images \
                 (scan_id, processing_instance, field_idx, channel, \
                  average_image, correlation_image, max_proj_image) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for img in images {
                let correlation = img.correlation_image.as_ref().map(blob::encode).transpose()?;
                let max_proj = img.max_proj_image.as_ref().map(blob::encode).transpose()?;
                count += stmt.execute(params![
                    key.scan_id,
                    instance,
                    img.field_idx,
                    img.channel,
                    blob::encode(&img.average_image)?,
                    correlation,
                    max_proj,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Inserted {} summary images for {}", count, key);
        Ok(count)
    }

    pub fn get_corrected_images(
        &self,
        key: &ProcessingTaskKey,
    ) -> Result<Vec<CorrectedImages>, Error> {
        let mut stmt = self.connection().prepare(
            "SELECT field_idx, channel, average_image, correlation_image, max_proj_image \
             FROM motion_corrected_images \
             WHERE scan_id = ?1 AND processing_instance = ?2 \
             ORDER BY field_idx, channel",
        )?;
        let rows = stmt
            .query_map(params![key.scan_id, key.instance_text()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, Option<Vec<u8>>>(3)?,
                    row.get::<_, Option<Vec<u8>>>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(field_idx, channel, average, correlation, max_proj)| {
                Ok(CorrectedImages {
                    field_idx,
                    channel,
                    average_image: blob::decode(&average)?,
                    correlation_image: decode_optional_image(correlation)?,
                    max_proj_image: decode_optional_image(max_proj)?,
                })
            })
            .collect()
    }
}

fn decode_optional_image(bytes: Option<Vec<u8>>) -> Result<Option<Image>, Error> {
    bytes.map(|b| blob::decode(&b)).transpose()
}
