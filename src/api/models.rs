use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::models::campaign::{Campaign, CampaignConfig, CampaignModule, CampaignStatus, Environment};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub module: Option<CampaignModule>,
    pub env: Option<Environment>,
    pub safe: Option<bool>,
    pub rate: Option<u32>,
    pub base_url: Option<String>,
    pub openapi_url: Option<String>,
    pub graphql_url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl CreateCampaignRequest {
    pub fn config(&self) -> CampaignConfig {
        CampaignConfig {
            base_url: self.base_url.clone(),
            openapi_url: self.openapi_url.clone(),
            graphql_url: self.graphql_url.clone(),
            headers: self.headers.clone(),
        }
    }

    pub fn into_campaign(self, id: String) -> Campaign {
        let mut campaign = Campaign::new(id, &self.config());
        if let Some(module) = self.module {
            campaign.module = module;
        }
        if let Some(env) = self.env {
            campaign.env = env;
        }
        if let Some(safe) = self.safe {
            campaign.safe = safe;
        }
        if let Some(rate) = self.rate {
            campaign.rate = rate;
        }
        campaign
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignResponse {
    pub ok: bool,
    pub campaign_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub ok: bool,
    pub campaign_id: String,
    pub status: CampaignStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
