use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{format_ts, parse_opt_uuid, parse_ts, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::{AuditAction, EntityType};
use crate::models::AuditEntry;

const AUDIT_COLUMNS: &str = "id, timestamp, action, entity_type, entity_id, details, reviewer_id, ip_address";

struct AuditRow {
    id: String,
    timestamp: String,
    action: String,
    entity_type: String,
    entity_id: Option<String>,
    details: Option<String>,
    reviewer_id: Option<String>,
    ip_address: Option<String>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<AuditRow> {
    Ok(AuditRow {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        action: row.get(2)?,
        entity_type: row.get(3)?,
        entity_id: row.get(4)?,
        details: row.get(5)?,
        reviewer_id: row.get(6)?,
        ip_address: row.get(7)?,
    })
}

fn entry_from_row(row: AuditRow) -> Result<AuditEntry, DatabaseError> {
    Ok(AuditEntry {
        id: parse_uuid("audit_log.id", &row.id)?,
        timestamp: parse_ts("audit_log.timestamp", &row.timestamp)?,
        action: AuditAction::from_str(&row.action)?,
        entity_type: EntityType::from_str(&row.entity_type)?,
        entity_id: parse_opt_uuid("audit_log.entity_id", row.entity_id)?,
        details: row.details.map(|d| serde_json::from_str(&d)).transpose()?,
        reviewer_id: parse_opt_uuid("audit_log.reviewer_id", row.reviewer_id)?,
        ip_address: row.ip_address,
    })
}

/// Append one entry to the audit log.
pub fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO audit_log ({AUDIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            entry.id.to_string(),
            format_ts(&entry.timestamp),
            entry.action.as_str(),
            entry.entity_type.as_str(),
            entry.entity_id.map(|id| id.to_string()),
            entry.details.as_ref().map(|d| d.to_string()),
            entry.reviewer_id.map(|id| id.to_string()),
            entry.ip_address,
        ],
    )?;
    Ok(())
}

/// Audit history of one entity, oldest first.
pub fn list_audit_for_entity(
    conn: &Connection,
    entity_type: EntityType,
    entity_id: &Uuid,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {AUDIT_COLUMNS} FROM audit_log
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp, rowid"
    ))?;
    let rows = stmt
        .query_map(params![entity_type.as_str(), entity_id.to_string()], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(entry_from_row).collect()
}

/// Everything one reviewer did, oldest first.
pub fn list_audit_by_reviewer(conn: &Connection, reviewer_id: &Uuid) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {AUDIT_COLUMNS} FROM audit_log
         WHERE reviewer_id = ?1
         ORDER BY timestamp, rowid"
    ))?;
    let rows = stmt
        .query_map(params![reviewer_id.to_string()], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(entry_from_row).collect()
}
