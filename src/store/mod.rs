//! Narrow persistence seams the campaign runner depends on.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use crate::errors::VishnoraError;
use crate::models::campaign::{Campaign, CampaignStatus};
use crate::models::finding::FindingRecord;

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, VishnoraError>;

    /// Atomically move `id` to `next`. Fails with `NotFound` for unknown ids
    /// and `IllegalTransition` when the lifecycle forbids the move.
    async fn update_status(&self, id: &str, next: CampaignStatus) -> Result<(), VishnoraError>;
}

/// Append-only. A finding and its evidence land together or not at all.
#[async_trait]
pub trait FindingSink: Send + Sync {
    async fn create(&self, campaign_id: &str, record: &FindingRecord) -> Result<(), VishnoraError>;
}
