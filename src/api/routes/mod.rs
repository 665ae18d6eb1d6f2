pub mod campaigns;
pub mod findings;
pub mod health;
