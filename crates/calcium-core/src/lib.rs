pub mod blob;
pub mod config;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod progress;
pub mod resolver;
pub mod scanner;
pub mod stages;
pub mod storage;

pub use config::AppConfig;
pub use engine::{PopulateSummary, ProcessingEngine, TriggerOutcome};
pub use error::Error;
pub use lookup::{CellCompartment, ProcessingMethod, RoiType};
pub use progress::{PopulateReporter, SilentReporter};
pub use resolver::{OutputDirResolver, Resolvers};
pub use storage::models::ProcessingTaskKey;
