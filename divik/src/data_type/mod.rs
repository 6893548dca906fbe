pub mod dataset;
pub mod traits;
pub mod types;
