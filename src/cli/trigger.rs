use std::time::Duration;
use reqwest::Client;
use serde_json::json;
use crate::cli::commands::TriggerArgs;
use crate::cli::status::{fetch_campaign, is_terminal, read_json};
use crate::errors::VishnoraError;
use tracing::info;

pub async fn handle_trigger(args: TriggerArgs) -> Result<(), VishnoraError> {
    let client = Client::new();
    let server = args.server.trim_end_matches('/');
    let config = args.surface.campaign_config();

    let body = json!({
        "module": args.module,
        "env": args.env,
        "safe": !args.allow_unsafe,
        "rate": args.surface.rate,
        "baseUrl": config.base_url,
        "openapiUrl": config.openapi_url,
        "graphqlUrl": config.graphql_url,
        "headers": config.headers,
    });

    let resp = client
        .post(format!("{}/api/campaigns", server))
        .json(&body)
        .send()
        .await
        .map_err(|e| VishnoraError::Network(format!("Failed to trigger campaign: {}", e)))?;
    let created = read_json(resp, "").await?;
    let campaign_id = created["campaignId"]
        .as_str()
        .ok_or_else(|| VishnoraError::Network("Response missing campaignId".into()))?
        .to_string();
    info!(campaign_id = %campaign_id, "Campaign triggered");
    println!("{}", campaign_id);

    if args.wait {
        loop {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let campaign = fetch_campaign(&client, server, &campaign_id).await?;
            let status = campaign["status"].as_str().unwrap_or("unknown");
            if is_terminal(status) {
                println!("{} {} findings={}", campaign_id, status, campaign["findingCount"].as_u64().unwrap_or(0));
                if status == "failed" {
                    return Err(VishnoraError::Internal(format!("Campaign {} failed", campaign_id)));
                }
                break;
            }
        }
    }
    Ok(())
}
