use std::time::Duration;
use reqwest::{Client, Response};
use serde_json::Value;
use crate::cli::commands::StatusArgs;
use crate::errors::VishnoraError;

pub async fn handle_status(args: StatusArgs) -> Result<(), VishnoraError> {
    let client = Client::new();
    let server = args.campaign.server.trim_end_matches('/');
    let id = &args.campaign.campaign_id;

    loop {
        let campaign = fetch_campaign(&client, server, id).await?;
        let status = campaign["status"].as_str().unwrap_or("unknown").to_string();
        let done = is_terminal(&status);

        if args.json {
            let findings = if done { Some(fetch_findings(&client, server, id).await?) } else { None };
            let mut out = campaign.clone();
            if let Some(findings) = findings {
                out["findings"] = findings["findings"].clone();
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!(
                "{}  status={}  findings={}",
                id,
                status,
                campaign["findingCount"].as_u64().unwrap_or(0)
            );
            if done {
                print_findings(&fetch_findings(&client, server, id).await?);
            }
        }

        if !args.follow || done {
            break;
        }
        tokio::time::sleep(Duration::from_secs(args.interval.max(1))).await;
    }
    Ok(())
}

pub fn is_terminal(status: &str) -> bool {
    matches!(status, "completed" | "failed" | "canceled")
}

pub async fn fetch_campaign(client: &Client, server: &str, id: &str) -> Result<Value, VishnoraError> {
    let resp = client
        .get(format!("{}/api/campaigns/{}", server, id))
        .send()
        .await
        .map_err(|e| VishnoraError::Network(format!("Failed to query campaign: {}", e)))?;
    read_json(resp, id).await
}

pub async fn fetch_findings(client: &Client, server: &str, id: &str) -> Result<Value, VishnoraError> {
    let resp = client
        .get(format!("{}/api/campaigns/{}/findings", server, id))
        .send()
        .await
        .map_err(|e| VishnoraError::Network(format!("Failed to fetch findings: {}", e)))?;
    read_json(resp, id).await
}

/// Map control API responses onto CLI errors; 404 keeps its meaning.
pub async fn read_json(resp: Response, campaign_id: &str) -> Result<Value, VishnoraError> {
    let status = resp.status();
    let body: Value = resp
        .json()
        .await
        .map_err(|e| VishnoraError::Network(format!("Invalid response: {}", e)))?;
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(VishnoraError::NotFound(campaign_id.to_string()));
    }
    if !status.is_success() {
        let message = body["error"].as_str().unwrap_or("unknown error");
        return Err(VishnoraError::Network(format!("Server returned {}: {}", status.as_u16(), message)));
    }
    Ok(body)
}

fn print_findings(findings: &Value) {
    let Some(list) = findings["findings"].as_array() else {
        return;
    };
    for f in list {
        println!(
            "  [{}] {} {} ({})",
            f["severity"].as_str().unwrap_or("?"),
            f["id"].as_str().unwrap_or("?"),
            f["title"].as_str().unwrap_or(""),
            f["service"].as_str().unwrap_or("")
        );
        if let Some(curl) = f["evidence"]["pocCurl"].as_str() {
            println!("      {}", curl);
        }
    }
}
