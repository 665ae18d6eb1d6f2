use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use crate::errors::VishnoraError;
use crate::models::campaign::{Campaign, CampaignStatus};
use crate::store::CampaignStore;
use super::Database;

const CAMPAIGN_COLUMNS: &str = "id, module, env, safe, rate, config, status, created_at";

fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = VishnoraError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_campaign(row: &rusqlite::Row) -> rusqlite::Result<Campaign> {
    let created_at: String = row.get(7)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(Campaign {
        id: row.get(0)?,
        module: parse_column(row, 1)?,
        env: parse_column(row, 2)?,
        safe: row.get::<_, i64>(3)? != 0,
        rate: row.get::<_, i64>(4)?.clamp(0, u32::MAX as i64) as u32,
        config: row.get(5)?,
        status: parse_column(row, 6)?,
        created_at,
    })
}

impl Database {
    pub fn create_campaign(&self, campaign: &Campaign) -> Result<(), VishnoraError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO campaigns (id, module, env, safe, rate, config, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                campaign.id,
                campaign.module.as_str(),
                campaign.env.as_str(),
                campaign.safe as i64,
                campaign.rate as i64,
                campaign.config,
                campaign.status.as_str(),
                campaign.created_at.to_rfc3339(),
            ],
        ).map_err(|e| VishnoraError::Persistence(format!("Failed to create campaign: {}", e)))?;
        Ok(())
    }

    pub fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, VishnoraError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM campaigns WHERE id = ?1", CAMPAIGN_COLUMNS),
                rusqlite::params![id],
                row_to_campaign,
            )
            .optional()
            .map_err(|e| VishnoraError::Persistence(format!("Query error: {}", e)))?;
        Ok(row)
    }

    pub fn list_campaigns(&self, limit: usize, offset: usize) -> Result<Vec<Campaign>, VishnoraError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM campaigns ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
            CAMPAIGN_COLUMNS
        )).map_err(|e| VishnoraError::Persistence(format!("Query failed: {}", e)))?;

        let rows = stmt
            .query_map(rusqlite::params![limit as i64, offset as i64], row_to_campaign)
            .map_err(|e| VishnoraError::Persistence(format!("Query error: {}", e)))?;

        let mut campaigns = Vec::new();
        for row in rows {
            campaigns.push(row.map_err(|e| VishnoraError::Persistence(format!("Row error: {}", e)))?);
        }
        Ok(campaigns)
    }

    /// Oldest first.
    pub fn campaign_ids_with_status(&self, status: CampaignStatus) -> Result<Vec<String>, VishnoraError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id FROM campaigns WHERE status = ?1 ORDER BY created_at ASC")
            .map_err(|e| VishnoraError::Persistence(format!("Query failed: {}", e)))?;
        let rows = stmt
            .query_map(rusqlite::params![status.as_str()], |row| row.get::<_, String>(0))
            .map_err(|e| VishnoraError::Persistence(format!("Query error: {}", e)))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| VishnoraError::Persistence(format!("Row error: {}", e)))
    }

    /// Validate against the lifecycle, then compare-and-set on the stored
    /// status so a concurrent writer can never be silently overwritten.
    pub fn set_campaign_status(&self, id: &str, next: CampaignStatus) -> Result<(), VishnoraError> {
        let conn = self.lock()?;
        let current: Option<String> = conn
            .query_row("SELECT status FROM campaigns WHERE id = ?1", rusqlite::params![id], |row| row.get(0))
            .optional()
            .map_err(|e| VishnoraError::Persistence(format!("Query error: {}", e)))?;
        let current: CampaignStatus = current
            .ok_or_else(|| VishnoraError::NotFound(id.to_string()))?
            .parse()?;
        current.transition(id, next)?;

        // Every legal target is either `running` or terminal.
        let stamp = if next == CampaignStatus::Running { "started_at" } else { "completed_at" };
        let sql = format!(
            "UPDATE campaigns SET status = ?2, {} = ?4 WHERE id = ?1 AND status = ?3",
            stamp
        );
        let affected = conn
            .execute(&sql, rusqlite::params![id, next.as_str(), current.as_str(), Utc::now().to_rfc3339()])
            .map_err(|e| VishnoraError::Persistence(format!("Update failed: {}", e)))?;
        if affected == 0 {
            return Err(VishnoraError::IllegalTransition {
                campaign_id: id.to_string(),
                from: current,
                to: next,
            });
        }
        Ok(())
    }

    /// `(started_at, completed_at)` as stored.
    pub fn campaign_timestamps(&self, id: &str) -> Result<Option<(Option<String>, Option<String>)>, VishnoraError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT started_at, completed_at FROM campaigns WHERE id = ?1",
            rusqlite::params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|e| VishnoraError::Persistence(format!("Query error: {}", e)))
    }
}

#[async_trait]
impl CampaignStore for Database {
    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, VishnoraError> {
        Database::get_campaign(self, id)
    }

    async fn update_status(&self, id: &str, next: CampaignStatus) -> Result<(), VishnoraError> {
        self.set_campaign_status(id, next)
    }
}
