use super::models::*;
use super::sqlite::{optional, Database};
use crate::blob;
use crate::error::Error;
use crate::lookup::RoiType;
use rusqlite::params;
use tracing::debug;

impl Database {
    pub fn insert_segmentation(&self, seg: &Segmentation) -> Result<(), Error> {
        let instance = seg.key.instance_text();
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO segmentation (scan_id, processing_instance, seg_channel) \
             VALUES (?1, ?2, ?3)",
            params![seg.key.scan_id, instance, seg.seg_channel],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO segmentation_mask \
                 (scan_id, processing_instance, mask_id, field_idx, npix, \
                  center_x, center_y, xpix, ypix, weights) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for mask in &seg.masks {
                stmt.execute(params![
                    seg.key.scan_id,
                    instance,
                    mask.mask_id,
                    mask.field_idx,
                    mask.npix,
                    mask.center_x,
                    mask.center_y,
                    blob::encode(&mask.xpix)?,
                    blob::encode(&mask.ypix)?,
                    blob::encode(&mask.weights)?,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Inserted segmentation for {} with {} masks", seg.key, seg.masks.len());
        Ok(())
    }

    pub fn get_segmentation(&self, key: &ProcessingTaskKey) -> Result<Option<Segmentation>, Error> {
        let seg_channel: Option<i64> = optional(self.connection().query_row(
            "SELECT seg_channel FROM segmentation \
             WHERE scan_id = ?1 AND processing_instance = ?2",
            params![key.scan_id, key.instance_text()],
            |row| row.get(0),
        ))?;
        match seg_channel {
            Some(seg_channel) => Ok(Some(Segmentation {
                key: *key,
                seg_channel,
                masks: self.get_masks(key)?,
            })),
            None => Ok(None),
        }
    }

    pub fn get_masks(&self, key: &ProcessingTaskKey) -> Result<Vec<Mask>, Error> {
        let mut stmt = self.connection().prepare(
            "SELECT mask_id, field_idx, npix, center_x, center_y, xpix, ypix, weights \
             FROM segmentation_mask \
             WHERE scan_id = ?1 AND processing_instance = ?2 \
             ORDER BY mask_id",
        )?;
        let rows = stmt
            .query_map(params![key.scan_id, key.instance_text()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, Vec<u8>>(5)?,
                    row.get::<_, Vec<u8>>(6)?,
                    row.get::<_, Vec<u8>>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(mask_id, field_idx, npix, center_x, center_y, xpix, ypix, weights)| {
                Ok(Mask {
                    mask_id,
                    field_idx,
                    npix,
                    center_x,
                    center_y,
                    xpix: blob::decode(&xpix)?,
                    ypix: blob::decode(&ypix)?,
                    weights: blob::decode(&weights)?,
                })
            })
            .collect()
    }

    // ── Mask classification ──────────────────────────────────────

    pub fn insert_mask_classification(
        &self,
        key: &ProcessingTaskKey,
        mask_types: &[MaskType],
    ) -> Result<usize, Error> {
        let instance = key.instance_text();
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO mask_classification (scan_id, processing_instance) VALUES (?1, ?2)",
            params![key.scan_id, instance],
        )?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO mask_type (scan_id, processing_instance, mask_id, roi_type) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for mask_type in mask_types {
                count += stmt.execute(params![
                    key.scan_id,
                    instance,
                    mask_type.mask_id,
                    mask_type.roi_type.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        debug!("Classified {} masks for {}", count, key);
        Ok(count)
    }

    pub fn get_mask_types(&self, key: &ProcessingTaskKey) -> Result<Vec<MaskType>, Error> {
        let mut stmt = self.connection().prepare(
            "SELECT mask_id, roi_type FROM mask_type \
             WHERE scan_id = ?1 AND processing_instance = ?2 \
             ORDER BY mask_id",
        )?;
        let rows = stmt
            .query_map(params![key.scan_id, key.instance_text()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(mask_id, roi_type)| {
                Ok(MaskType {
                    mask_id,
                    roi_type: roi_type.parse::<RoiType>()?,
                })
            })
            .collect()
    }
}
