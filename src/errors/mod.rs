pub mod types;
pub mod classification;

pub use types::VishnoraError;
pub use classification::{ErrorClassification, ErrorScope};
