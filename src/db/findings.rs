use std::collections::BTreeMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::errors::VishnoraError;
use crate::models::finding::{Evidence, Finding, FindingRecord};
use crate::store::FindingSink;
use super::Database;

impl Database {
    /// Finding and evidence are written in one transaction.
    pub fn insert_finding(&self, campaign_id: &str, record: &FindingRecord) -> Result<(), VishnoraError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()
            .map_err(|e| VishnoraError::Persistence(format!("Failed to begin transaction: {}", e)))?;

        let finding = &record.finding;
        tx.execute(
            "INSERT INTO findings (id, campaign_id, title, severity, module, service, status, time) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                finding.id,
                campaign_id,
                finding.title,
                finding.severity.as_str(),
                finding.module,
                finding.service,
                finding.status.as_str(),
                finding.time.to_rfc3339(),
            ],
        ).map_err(|e| VishnoraError::Persistence(format!("Failed to insert finding: {}", e)))?;

        let details = serde_json::to_string(&record.evidence.details)?;
        tx.execute(
            "INSERT INTO evidence (finding_id, poc_curl, res_sample, details) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![finding.id, record.evidence.poc_curl, record.evidence.res_sample, details],
        ).map_err(|e| VishnoraError::Persistence(format!("Failed to insert evidence: {}", e)))?;

        tx.commit()
            .map_err(|e| VishnoraError::Persistence(format!("Failed to commit finding: {}", e)))
    }

    pub fn get_findings(&self, campaign_id: &str) -> Result<Vec<FindingRecord>, VishnoraError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT f.id, f.title, f.severity, f.module, f.service, f.status, f.time, e.poc_curl, e.res_sample, e.details \
             FROM findings f JOIN evidence e ON e.finding_id = f.id \
             WHERE f.campaign_id = ?1 ORDER BY f.time, f.rowid"
        ).map_err(|e| VishnoraError::Persistence(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![campaign_id], |row: &rusqlite::Row| {
            let severity: String = row.get(2)?;
            let status: String = row.get(5)?;
            let time: String = row.get(6)?;
            let details: String = row.get(9)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                severity,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                status,
                time,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
                details,
            ))
        }).map_err(|e| VishnoraError::Persistence(format!("Query error: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, title, severity, module, service, status, time, poc_curl, res_sample, details) =
                row.map_err(|e| VishnoraError::Persistence(format!("Row error: {}", e)))?;
            let time = DateTime::parse_from_rfc3339(&time)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| VishnoraError::Persistence(format!("Bad finding time {}: {}", time, e)))?;
            let details: BTreeMap<String, String> = serde_json::from_str(&details)?;
            records.push(FindingRecord {
                finding: Finding {
                    id,
                    title,
                    severity: severity.parse()?,
                    module,
                    service,
                    status: status.parse()?,
                    time,
                },
                evidence: Evidence { poc_curl, res_sample, details },
            });
        }
        Ok(records)
    }

    pub fn count_findings(&self, campaign_id: &str) -> Result<usize, VishnoraError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM findings WHERE campaign_id = ?1",
                rusqlite::params![campaign_id],
                |row| row.get(0),
            )
            .map_err(|e| VishnoraError::Persistence(format!("Query error: {}", e)))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl FindingSink for Database {
    async fn create(&self, campaign_id: &str, record: &FindingRecord) -> Result<(), VishnoraError> {
        self.insert_finding(campaign_id, record)
    }
}
