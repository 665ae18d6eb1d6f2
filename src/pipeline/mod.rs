pub mod orchestrator;
pub mod state;

pub use orchestrator::{CampaignRunner, RunnerSettings};
pub use state::{RunReport, SourceOutcome};
