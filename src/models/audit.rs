use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::enums::{AuditAction, EntityType};

/// Append-only record of a reviewer or admin action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: NaiveDateTime,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Option<Uuid>,
    pub details: Option<Value>,
    pub reviewer_id: Option<Uuid>,
    pub ip_address: Option<String>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, entity_type: EntityType, timestamp: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            action,
            entity_type,
            entity_id: None,
            details: None,
            reviewer_id: None,
            ip_address: None,
        }
    }

    pub fn entity(mut self, id: Uuid) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn by(mut self, reviewer_id: Uuid) -> Self {
        self.reviewer_id = Some(reviewer_id);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}
