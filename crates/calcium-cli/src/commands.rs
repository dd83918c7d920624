use calcium_core::ProcessingMethod;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "calcium")]
#[command(about = "Track calcium imaging processing tasks and their results", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the database and apply schema migrations
    Init,
    /// Register a scan with its fields and channels
    AddScan {
        scan_id: i64,
        /// Path of the raw scan, relative to the root data directory
        scan_path: String,
        /// Field dimensions as HEIGHTxWIDTH, one per field in index order
        #[arg(long = "field", value_name = "HEIGHTxWIDTH")]
        fields: Vec<String>,
        /// Channel indices recorded in the scan
        #[arg(long = "channel")]
        channels: Vec<i64>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Add a parameter set for suite2p or caiman
    AddParamset {
        method: ProcessingMethod,
        paramset_idx: i64,
        /// JSON file holding the tool parameters
        params_file: PathBuf,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Register a processing task for a scan
    Submit {
        scan_id: i64,
        method: ProcessingMethod,
        paramset_idx: i64,
        /// Instance token, generated when omitted
        #[arg(long)]
        instance: Option<Uuid>,
    },
    /// Check one task for output and record it if present
    Trigger { scan_id: i64, instance: Uuid },
    /// Check every pending task
    Populate,
    /// List tasks and whether they are complete
    Status,
    /// Print configuration values
    PrintConfig,
    /// Truncate all data tables (lookup tables are kept)
    TruncateDb,
}
