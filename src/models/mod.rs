pub mod campaign;
pub mod finding;
pub mod target;

pub use campaign::*;
pub use finding::*;
pub use target::*;
