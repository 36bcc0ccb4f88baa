pub mod repository;

pub use repository::{ModelRecord, ModelRepository, STORE_FILE};
