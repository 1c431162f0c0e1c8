//! Repository layer — entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`. Callers own transactions.
//! All public functions are re-exported here.

mod assessment;
mod audit;
mod payout;
mod reviewer;
mod settings;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::DatabaseError;

pub use assessment::*;
pub use audit::*;
pub use payout::*;
pub use reviewer::*;
pub use settings::*;

/// Storage format for every timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_ts(field: &str, raw: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| DatabaseError::InvalidValue {
            field: field.into(),
            value: raw.into(),
        })
}

pub(crate) fn parse_opt_ts(
    field: &str,
    raw: Option<String>,
) -> Result<Option<NaiveDateTime>, DatabaseError> {
    raw.map(|s| parse_ts(field, &s)).transpose()
}

pub(crate) fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|_| DatabaseError::InvalidValue {
        field: field.into(),
        value: raw.into(),
    })
}

pub(crate) fn parse_opt_uuid(field: &str, raw: Option<String>) -> Result<Option<Uuid>, DatabaseError> {
    raw.map(|s| parse_uuid(field, &s)).transpose()
}

/// Map a zero-row UPDATE onto `NotFound`.
pub(crate) fn require_updated(
    changed: usize,
    entity_type: &str,
    id: &Uuid,
) -> Result<(), DatabaseError> {
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, NaiveDateTime};
    use rusqlite::Connection;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::models::enums::{AssessmentStatus, ReviewerRole, ReviewerStatus};
    use crate::models::{Assessment, AssessmentSections, ConsentRecord, Reviewer};

    pub fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    pub fn reviewer(email: &str, role: ReviewerRole, fee_cents: i64) -> Reviewer {
        Reviewer {
            id: Uuid::new_v4(),
            name: format!("Dr. {email}"),
            email: email.into(),
            license_number: Some("MD-1001".into()),
            role,
            status: ReviewerStatus::Approved,
            is_active: true,
            fee_per_review_cents: fee_cents,
            created_at: ts(1, 8),
            approved_at: Some(ts(1, 9)),
            approved_by: None,
        }
    }

    pub fn seed_reviewer(conn: &Connection, email: &str, role: ReviewerRole, fee_cents: i64) -> Reviewer {
        let r = reviewer(email, role, fee_cents);
        insert_reviewer(conn, &r).unwrap();
        r
    }

    pub fn assessment(first: &str, last: &str, created_at: NaiveDateTime) -> Assessment {
        Assessment {
            id: Uuid::new_v4(),
            created_at,
            updated_at: created_at,
            sections: AssessmentSections {
                patient_info: json!({
                    "firstName": first,
                    "lastName": last,
                    "email": format!("{}@example.com", first.to_lowercase()),
                }),
                medical_history: json!({ "hasDiabetes": true }),
                medications: json!({}),
                sexual_health: json!({}),
                contraindications: json!({ "currentBPSystolic": "120" }),
                pt141: json!({}),
                oxytocin: json!({}),
            },
            consent: ConsentRecord {
                signed: true,
                signature_data: Some("data:image/png;base64,AAAA".into()),
                signed_at: created_at,
            },
            risk_flags: vec![],
            is_auto_disqualified: false,
            requires_review: true,
            status: AssessmentStatus::Pending,
            reviewer_id: None,
            reviewer_notes: None,
            denial_reason: None,
            decided_at: None,
            shipped_at: None,
            tracking_number: None,
            ip_address: Some("203.0.113.7".into()),
            user_agent: Some("test-agent".into()),
        }
    }

    pub fn seed_assessment(conn: &Connection, first: &str, created_at: NaiveDateTime) -> Assessment {
        let a = assessment(first, "Doe", created_at);
        insert_assessment(conn, &a).unwrap();
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_round_trip_at_second_precision() {
        let ts = fixtures::ts(5, 14);
        assert_eq!(format_ts(&ts), "2024-03-05 14:00:00");
        assert_eq!(parse_ts("t", &format_ts(&ts)).unwrap(), ts);
        assert_eq!(parse_ts("t", "2024-03-05T14:00:00").unwrap(), ts);
    }

    #[test]
    fn malformed_values_are_reported() {
        assert!(matches!(
            parse_ts("created_at", "yesterday"),
            Err(DatabaseError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_uuid("id", "not-a-uuid"),
            Err(DatabaseError::InvalidValue { .. })
        ));
        assert_eq!(parse_opt_uuid("id", None).unwrap(), None);
    }

    #[test]
    fn zero_row_update_is_not_found() {
        let id = Uuid::new_v4();
        assert!(require_updated(1, "Reviewer", &id).is_ok());
        assert!(matches!(
            require_updated(0, "Reviewer", &id),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
