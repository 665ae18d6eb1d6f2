pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod evidence;
pub mod models;
pub mod pipeline;
pub mod probe;
pub mod queue;
pub mod store;
pub mod surface;
pub mod utils;
