pub mod formatting;
pub mod http;
pub mod truncation;
