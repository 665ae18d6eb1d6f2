use reqwest::Client;
use crate::cli::commands::CampaignRef;
use crate::cli::status::read_json;
use crate::errors::VishnoraError;
use tracing::info;

pub async fn handle_cancel(args: CampaignRef) -> Result<(), VishnoraError> {
    info!(campaign_id = %args.campaign_id, "Canceling campaign");
    let client = Client::new();
    let resp = client
        .post(format!("{}/api/campaigns/{}/cancel", args.server.trim_end_matches('/'), args.campaign_id))
        .send()
        .await
        .map_err(|e| VishnoraError::Network(format!("Failed to cancel campaign: {}", e)))?;
    let accepted = resp.status() == reqwest::StatusCode::ACCEPTED;
    read_json(resp, &args.campaign_id).await?;

    if accepted {
        println!("Cancel signalled to running campaign {}", args.campaign_id);
    } else {
        println!("Campaign {} canceled", args.campaign_id);
    }
    Ok(())
}
