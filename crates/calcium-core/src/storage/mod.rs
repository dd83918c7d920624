mod activity;
pub mod models;
mod motion;
mod segmentation;
mod sqlite;
mod tasks;
mod upstream;

pub use sqlite::Database;
pub use upstream::LookupTable;
