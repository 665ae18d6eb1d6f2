pub mod recorder;

pub use recorder::{poc_curl_graphql, poc_curl_rest, EvidenceRecorder};
