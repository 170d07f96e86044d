pub mod params;
pub mod reader;

pub use params::{CheckpointParams, WeightDType};
pub use reader::Checkpoint;
