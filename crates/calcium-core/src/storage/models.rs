use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blob::Image;
use crate::lookup::{ProcessingMethod, RoiType};

/// Primary key of a processing task and of every row downstream of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessingTaskKey {
    pub scan_id: i64,
    pub processing_instance: Uuid,
}

impl ProcessingTaskKey {
    pub fn new(scan_id: i64, processing_instance: Uuid) -> Self {
        Self {
            scan_id,
            processing_instance,
        }
    }

    /// Key with a fresh random instance token.
    pub fn generate(scan_id: i64) -> Self {
        Self::new(scan_id, Uuid::new_v4())
    }

    pub(crate) fn instance_text(&self) -> String {
        self.processing_instance.hyphenated().to_string()
    }
}

impl fmt::Display for ProcessingTaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan {} / {}", self.scan_id, self.processing_instance)
    }
}

// ── Upstream ─────────────────────────────────────────────────────

/// One microscopy acquisition session.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    pub scan_id: i64,
    pub scan_path: String,
    pub description: String,
}

/// A spatial subregion of a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanField {
    pub scan_id: i64,
    pub field_idx: i64,
    pub px_height: i64,
    pub px_width: i64,
}

// ── Parameter sets ───────────────────────────────────────────────

/// Method-specific parameter record referenced by a parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSetSpecialization {
    Caiman { caiman_paramset_id: i64 },
    Suite2p { suite2p_paramset_id: i64 },
}

impl ParamSetSpecialization {
    pub fn method(&self) -> ProcessingMethod {
        match self {
            ParamSetSpecialization::Caiman { .. } => ProcessingMethod::Caiman,
            ParamSetSpecialization::Suite2p { .. } => ProcessingMethod::Suite2p,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSet {
    pub paramset_idx: i64,
    pub paramset_desc: String,
    pub specialization: ParamSetSpecialization,
}

impl ParamSet {
    pub fn method(&self) -> ProcessingMethod {
        self.specialization.method()
    }
}

// ── Processing ───────────────────────────────────────────────────

/// A registered processing task. The method is kept as stored text so an
/// unrecognized value surfaces when the task is triggered.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingTask {
    pub key: ProcessingTaskKey,
    pub processing_method: String,
    pub paramset_idx: i64,
}

/// Completion record written once the output directory is observed.
#[derive(Debug, Clone, PartialEq)]
pub struct Processing {
    pub key: ProcessingTaskKey,
    pub processing_time: String,
    pub output_files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Complete,
}

/// A task joined with its completion record, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSummary {
    pub task: ProcessingTask,
    pub processing_time: Option<String>,
    pub output_file_count: i64,
}

impl TaskSummary {
    pub fn status(&self) -> TaskStatus {
        if self.processing_time.is_some() {
            TaskStatus::Complete
        } else {
            TaskStatus::Pending
        }
    }
}

// ── Motion correction ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct MotionCorrection {
    pub key: ProcessingTaskKey,
    pub mc_channel: i64,
    pub fields: Vec<FieldMotion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMotion {
    pub field_idx: i64,
    pub correction: FieldCorrection,
}

/// A field is corrected either rigidly or piece-wise rigidly, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCorrection {
    Rigid(RigidShifts),
    NonRigid(NonRigidShifts),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RigidShifts {
    /// image used as alignment template
    pub ref_image: Image,
    /// true for frames with outlier shifts (already corrected)
    pub outlier_frames: Vec<bool>,
    pub y_shifts: Vec<f32>,
    pub x_shifts: Vec<f32>,
    pub y_std: f64,
    pub x_std: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NonRigidShifts {
    pub ref_image: Image,
    pub outlier_frames: Vec<bool>,
    pub block_height: i64,
    pub block_width: i64,
    pub block_count_y: i64,
    pub block_count_x: i64,
    pub blocks: Vec<MotionBlock>,
}

/// One spatial tile of a piece-wise rigid correction. Ranges are
/// `(start, end)` in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionBlock {
    pub block_id: i64,
    pub block_y: (i64, i64),
    pub block_x: (i64, i64),
    pub y_shifts: Vec<f32>,
    pub x_shifts: Vec<f32>,
    pub y_std: f64,
    pub x_std: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedImages {
    pub field_idx: i64,
    pub channel: i64,
    pub average_image: Image,
    pub correlation_image: Option<Image>,
    pub max_proj_image: Option<Image>,
}

// ── Segmentation ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub key: ProcessingTaskKey,
    pub seg_channel: i64,
    pub masks: Vec<Mask>,
}

/// A region of interest produced by segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub mask_id: i64,
    pub field_idx: i64,
    pub npix: Option<i64>,
    pub center_x: i64,
    pub center_y: i64,
    pub xpix: Vec<i64>,
    pub ypix: Vec<i64>,
    /// weights at the pixel indices above, column-major order
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskType {
    pub mask_id: i64,
    pub roi_type: RoiType,
}

// ── Activity ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub mask_id: i64,
    pub roi_channel: i64,
    pub fluo: Vec<f32>,
    pub neuropil_fluo: Vec<f32>,
}

/// Deconvolved activity for one trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Dff {
    pub mask_id: i64,
    pub roi_channel: i64,
    pub df_f: Vec<f32>,
}
