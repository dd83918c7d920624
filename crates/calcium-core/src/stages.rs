//! Ingestion of externally computed results. Every stage is written once per
//! task, in a single transaction, and only after its upstream stage exists.

use std::collections::HashSet;

use tracing::info;

use crate::error::Error;
use crate::storage::models::*;
use crate::storage::Database;

fn require_absent(
    db: &Database,
    table: &str,
    stage: &'static str,
    key: &ProcessingTaskKey,
) -> Result<(), Error> {
    if db.task_row_exists(table, key)? {
        return Err(Error::AlreadyPopulated { stage, key: *key });
    }
    Ok(())
}

fn require_upstream(
    db: &Database,
    table: &str,
    stage: &'static str,
    upstream: &'static str,
    key: &ProcessingTaskKey,
) -> Result<(), Error> {
    if !db.task_row_exists(table, key)? {
        return Err(Error::MissingUpstream {
            stage,
            upstream,
            key: *key,
        });
    }
    Ok(())
}

fn require_unique<I>(ids: I, what: &str) -> Result<(), Error>
where
    I: IntoIterator,
    I::Item: Eq + std::hash::Hash + std::fmt::Debug,
{
    let mut seen = HashSet::new();
    for id in ids {
        if seen.contains(&id) {
            return Err(Error::Invalid(format!("duplicate {} {:?}", what, id)));
        }
        seen.insert(id);
    }
    Ok(())
}

// ── Motion correction ────────────────────────────────────────────

/// Requires a completed Processing row. Each field appears once, so it is
/// either rigid or non-rigid; block ids are unique within a field.
pub fn ingest_motion_correction(db: &Database, mc: &MotionCorrection) -> Result<(), Error> {
    require_upstream(db, "processing", "motion correction", "processing", &mc.key)?;
    require_absent(db, "motion_correction", "motion correction", &mc.key)?;
    require_unique(mc.fields.iter().map(|f| f.field_idx), "field")?;
    for field in &mc.fields {
        if let FieldCorrection::NonRigid(nonrigid) = &field.correction {
            require_unique(
                nonrigid.blocks.iter().map(|b| b.block_id),
                &format!("block in field {}", field.field_idx),
            )?;
        }
    }

    db.insert_motion_correction(mc)?;
    info!("Ingested motion correction for {} ({} fields)", mc.key, mc.fields.len());
    Ok(())
}

pub fn ingest_corrected_images(
    db: &Database,
    key: &ProcessingTaskKey,
    images: &[CorrectedImages],
) -> Result<usize, Error> {
    require_upstream(
        db,
        "motion_correction",
        "summary images",
        "motion correction",
        key,
    )?;
    require_absent(db, "motion_corrected_images", "summary images", key)?;
    require_unique(images.iter().map(|i| (i.field_idx, i.channel)), "field/channel")?;

    let count = db.insert_corrected_images(key, images)?;
    info!("Ingested {} summary images for {}", count, key);
    Ok(count)
}

// ── Segmentation ─────────────────────────────────────────────────

pub fn ingest_segmentation(db: &Database, seg: &Segmentation) -> Result<(), Error> {
    require_upstream(
        db,
        "motion_correction",
        "segmentation",
        "motion correction",
        &seg.key,
    )?;
    require_absent(db, "segmentation", "segmentation", &seg.key)?;
    require_unique(seg.masks.iter().map(|m| m.mask_id), "mask")?;

    db.insert_segmentation(seg)?;
    info!("Ingested segmentation for {} ({} masks)", seg.key, seg.masks.len());
    Ok(())
}

/// One classification per mask.
pub fn ingest_mask_classification(
    db: &Database,
    key: &ProcessingTaskKey,
    mask_types: &[MaskType],
) -> Result<usize, Error> {
    require_upstream(db, "segmentation", "mask classification", "segmentation", key)?;
    require_absent(db, "mask_classification", "mask classification", key)?;
    require_unique(mask_types.iter().map(|m| m.mask_id), "mask")?;

    let count = db.insert_mask_classification(key, mask_types)?;
    info!("Ingested {} mask classifications for {}", count, key);
    Ok(count)
}

// ── Activity ─────────────────────────────────────────────────────

pub fn ingest_fluorescence(
    db: &Database,
    key: &ProcessingTaskKey,
    traces: &[Trace],
) -> Result<usize, Error> {
    require_upstream(db, "segmentation", "fluorescence", "segmentation", key)?;
    require_absent(db, "fluorescence", "fluorescence", key)?;
    require_unique(traces.iter().map(|t| (t.mask_id, t.roi_channel)), "mask/channel")?;

    let count = db.insert_fluorescence(key, traces)?;
    info!("Ingested {} fluorescence traces for {}", count, key);
    Ok(count)
}

pub fn ingest_deconvolution(
    db: &Database,
    key: &ProcessingTaskKey,
    dffs: &[Dff],
) -> Result<usize, Error> {
    require_upstream(db, "fluorescence", "deconvolution", "fluorescence", key)?;
    require_absent(db, "deconvolved_activity", "deconvolution", key)?;
    require_unique(dffs.iter().map(|d| (d.mask_id, d.roi_channel)), "mask/channel")?;

    let count = db.insert_deconvolution(key, dffs)?;
    info!("Ingested {} deconvolved traces for {}", count, key);
    Ok(count)
}
