pub mod campaigns;
pub mod connection;
pub mod findings;
pub mod schema;

pub use connection::Database;
