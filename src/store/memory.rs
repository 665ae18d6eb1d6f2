use async_trait::async_trait;
use dashmap::DashMap;
use crate::errors::VishnoraError;
use crate::models::campaign::{Campaign, CampaignStatus};
use crate::models::finding::FindingRecord;
use super::{CampaignStore, FindingSink};

/// Process-local store used by one-shot probe runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    campaigns: DashMap<String, Campaign>,
    findings: DashMap<String, Vec<FindingRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, campaign: Campaign) {
        self.campaigns.insert(campaign.id.clone(), campaign);
    }

    pub fn status(&self, id: &str) -> Option<CampaignStatus> {
        self.campaigns.get(id).map(|c| c.status)
    }

    pub fn findings(&self, campaign_id: &str) -> Vec<FindingRecord> {
        self.findings
            .get(campaign_id)
            .map(|f| f.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, VishnoraError> {
        Ok(self.campaigns.get(id).map(|c| c.clone()))
    }

    async fn update_status(&self, id: &str, next: CampaignStatus) -> Result<(), VishnoraError> {
        // The shard lock held by get_mut makes check-and-set atomic.
        let mut campaign = self.campaigns
            .get_mut(id)
            .ok_or_else(|| VishnoraError::NotFound(id.to_string()))?;
        campaign.status = campaign.status.transition(id, next)?;
        Ok(())
    }
}

#[async_trait]
impl FindingSink for MemoryStore {
    async fn create(&self, campaign_id: &str, record: &FindingRecord) -> Result<(), VishnoraError> {
        if !self.campaigns.contains_key(campaign_id) {
            return Err(VishnoraError::Persistence(format!(
                "Finding {} references unknown campaign {}",
                record.finding.id, campaign_id
            )));
        }
        self.findings
            .entry(campaign_id.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::campaign::CampaignConfig;

    #[tokio::test]
    async fn test_update_status_enforces_lifecycle() {
        let store = MemoryStore::new();
        store.insert(Campaign::new("c-1", &CampaignConfig::default()));

        store.update_status("c-1", CampaignStatus::Running).await.unwrap();
        store.update_status("c-1", CampaignStatus::Completed).await.unwrap();
        let err = store.update_status("c-1", CampaignStatus::Running).await.unwrap_err();
        assert!(matches!(err, VishnoraError::IllegalTransition { .. }));
        assert_eq!(store.status("c-1"), Some(CampaignStatus::Completed));
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update_status("nope", CampaignStatus::Running).await.unwrap_err();
        assert!(matches!(err, VishnoraError::NotFound(_)));
    }
}
