use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_ts, parse_opt_ts, parse_opt_uuid, parse_ts, parse_uuid, require_updated};
use crate::db::DatabaseError;
use crate::models::enums::{AssessmentStatus, Decision};
use crate::models::{Assessment, AssessmentSections, ConsentRecord};

const ASSESSMENT_COLUMNS: &str = "id, created_at, updated_at, patient_info, medical_history,
    medications, sexual_health, contraindications, pt141_section, oxytocin_section,
    consent_signed, signature_data, consent_timestamp, risk_flags, is_auto_disqualified,
    requires_review, status, reviewer_id, reviewer_notes, denial_reason, decided_at,
    shipped_at, tracking_number, ip_address, user_agent";

struct AssessmentRow {
    id: String,
    created_at: String,
    updated_at: String,
    patient_info: String,
    medical_history: String,
    medications: String,
    sexual_health: String,
    contraindications: String,
    pt141_section: String,
    oxytocin_section: String,
    consent_signed: i32,
    signature_data: Option<String>,
    consent_timestamp: String,
    risk_flags: String,
    is_auto_disqualified: i32,
    requires_review: i32,
    status: String,
    reviewer_id: Option<String>,
    reviewer_notes: Option<String>,
    denial_reason: Option<String>,
    decided_at: Option<String>,
    shipped_at: Option<String>,
    tracking_number: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<AssessmentRow> {
    Ok(AssessmentRow {
        id: row.get(0)?,
        created_at: row.get(1)?,
        updated_at: row.get(2)?,
        patient_info: row.get(3)?,
        medical_history: row.get(4)?,
        medications: row.get(5)?,
        sexual_health: row.get(6)?,
        contraindications: row.get(7)?,
        pt141_section: row.get(8)?,
        oxytocin_section: row.get(9)?,
        consent_signed: row.get(10)?,
        signature_data: row.get(11)?,
        consent_timestamp: row.get(12)?,
        risk_flags: row.get(13)?,
        is_auto_disqualified: row.get(14)?,
        requires_review: row.get(15)?,
        status: row.get(16)?,
        reviewer_id: row.get(17)?,
        reviewer_notes: row.get(18)?,
        denial_reason: row.get(19)?,
        decided_at: row.get(20)?,
        shipped_at: row.get(21)?,
        tracking_number: row.get(22)?,
        ip_address: row.get(23)?,
        user_agent: row.get(24)?,
    })
}

fn assessment_from_row(row: AssessmentRow) -> Result<Assessment, DatabaseError> {
    Ok(Assessment {
        id: parse_uuid("assessments.id", &row.id)?,
        created_at: parse_ts("assessments.created_at", &row.created_at)?,
        updated_at: parse_ts("assessments.updated_at", &row.updated_at)?,
        sections: AssessmentSections {
            patient_info: serde_json::from_str(&row.patient_info)?,
            medical_history: serde_json::from_str(&row.medical_history)?,
            medications: serde_json::from_str(&row.medications)?,
            sexual_health: serde_json::from_str(&row.sexual_health)?,
            contraindications: serde_json::from_str(&row.contraindications)?,
            pt141: serde_json::from_str(&row.pt141_section)?,
            oxytocin: serde_json::from_str(&row.oxytocin_section)?,
        },
        consent: ConsentRecord {
            signed: row.consent_signed != 0,
            signature_data: row.signature_data,
            signed_at: parse_ts("assessments.consent_timestamp", &row.consent_timestamp)?,
        },
        risk_flags: serde_json::from_str(&row.risk_flags)?,
        is_auto_disqualified: row.is_auto_disqualified != 0,
        requires_review: row.requires_review != 0,
        status: AssessmentStatus::from_str(&row.status)?,
        reviewer_id: parse_opt_uuid("assessments.reviewer_id", row.reviewer_id)?,
        reviewer_notes: row.reviewer_notes,
        denial_reason: row.denial_reason,
        decided_at: parse_opt_ts("assessments.decided_at", row.decided_at)?,
        shipped_at: parse_opt_ts("assessments.shipped_at", row.shipped_at)?,
        tracking_number: row.tracking_number,
        ip_address: row.ip_address,
        user_agent: row.user_agent,
    })
}

pub fn insert_assessment(conn: &Connection, a: &Assessment) -> Result<(), DatabaseError> {
    let s = &a.sections;
    conn.execute(
        &format!(
            "INSERT INTO assessments ({ASSESSMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                     ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)"
        ),
        params![
            a.id.to_string(),
            format_ts(&a.created_at),
            format_ts(&a.updated_at),
            serde_json::to_string(&s.patient_info)?,
            serde_json::to_string(&s.medical_history)?,
            serde_json::to_string(&s.medications)?,
            serde_json::to_string(&s.sexual_health)?,
            serde_json::to_string(&s.contraindications)?,
            serde_json::to_string(&s.pt141)?,
            serde_json::to_string(&s.oxytocin)?,
            a.consent.signed as i32,
            a.consent.signature_data,
            format_ts(&a.consent.signed_at),
            serde_json::to_string(&a.risk_flags)?,
            a.is_auto_disqualified as i32,
            a.requires_review as i32,
            a.status.as_str(),
            a.reviewer_id.map(|id| id.to_string()),
            a.reviewer_notes,
            a.denial_reason,
            a.decided_at.as_ref().map(format_ts),
            a.shipped_at.as_ref().map(format_ts),
            a.tracking_number,
            a.ip_address,
            a.user_agent,
        ],
    )?;
    Ok(())
}

pub fn get_assessment(conn: &Connection, id: &Uuid) -> Result<Option<Assessment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ?1"),
            params![id.to_string()],
            read_row,
        )
        .optional()?;
    row.map(assessment_from_row).transpose()
}

/// Assessments newest first, optionally restricted to one status.
pub fn list_assessments(
    conn: &Connection,
    status: Option<AssessmentStatus>,
) -> Result<Vec<Assessment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSESSMENT_COLUMNS} FROM assessments
         WHERE ?1 IS NULL OR status = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map(params![status.map(|s| s.as_str())], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(assessment_from_row).collect()
}

/// Number of assessments per status. Statuses with no rows are absent.
pub fn count_assessments_by_status(
    conn: &Connection,
) -> Result<Vec<(AssessmentStatus, i64)>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM assessments GROUP BY status")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(status, count)| Ok((AssessmentStatus::from_str(&status)?, count)))
        .collect()
}

/// Record a reviewer's decision on a pending assessment.
pub fn record_assessment_decision(
    conn: &Connection,
    id: &Uuid,
    decision: Decision,
    reviewer_id: &Uuid,
    notes: Option<&str>,
    denial_reason: Option<&str>,
    decided_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE assessments
         SET status = ?2, reviewer_id = ?3, reviewer_notes = ?4, denial_reason = ?5,
             decided_at = ?6, updated_at = ?6
         WHERE id = ?1 AND status = 'pending'",
        params![
            id.to_string(),
            decision.status().as_str(),
            reviewer_id.to_string(),
            notes,
            denial_reason,
            format_ts(decided_at),
        ],
    )?;
    require_updated(changed, "PendingAssessment", id)
}

/// Move an approved assessment to shipped.
pub fn record_assessment_shipment(
    conn: &Connection,
    id: &Uuid,
    tracking_number: Option<&str>,
    shipped_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE assessments
         SET status = 'shipped', shipped_at = ?2, tracking_number = ?3, updated_at = ?2
         WHERE id = ?1 AND status = 'approved'",
        params![id.to_string(), format_ts(shipped_at), tracking_number],
    )?;
    require_updated(changed, "ApprovedAssessment", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::ReviewerRole;
    use crate::screening::{FlagCode, RiskFlag};

    #[test]
    fn insert_and_get_round_trips_every_column() {
        let conn = open_memory_database().unwrap();
        let mut a = assessment("Ana", "Lima", ts(2, 10));
        a.risk_flags = vec![RiskFlag::new(FlagCode::Diabetes, "Patient has diabetes")];
        insert_assessment(&conn, &a).unwrap();

        let stored = get_assessment(&conn, &a.id).unwrap().unwrap();
        assert_eq!(stored.sections, a.sections);
        assert_eq!(stored.consent, a.consent);
        assert_eq!(stored.risk_flags, a.risk_flags);
        assert_eq!(stored.status, AssessmentStatus::Pending);
        assert_eq!(stored.created_at, a.created_at);
        assert_eq!(stored.ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_assessment(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first_and_filters_by_status() {
        let conn = open_memory_database().unwrap();
        let reviewer = seed_reviewer(&conn, "doc@example.com", ReviewerRole::Physician, 500);
        let older = seed_assessment(&conn, "Old", ts(1, 9));
        let newer = seed_assessment(&conn, "New", ts(3, 9));
        record_assessment_decision(
            &conn,
            &older.id,
            Decision::Approved,
            &reviewer.id,
            None,
            None,
            &ts(4, 9),
        )
        .unwrap();

        let all = list_assessments(&conn, None).unwrap();
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        let pending = list_assessments(&conn, Some(AssessmentStatus::Pending)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, newer.id);
    }

    #[test]
    fn status_counts_group_rows() {
        let conn = open_memory_database().unwrap();
        seed_assessment(&conn, "A", ts(1, 9));
        seed_assessment(&conn, "B", ts(1, 10));
        let counts = count_assessments_by_status(&conn).unwrap();
        assert_eq!(counts, vec![(AssessmentStatus::Pending, 2)]);
    }

    #[test]
    fn decision_only_applies_to_pending() {
        let conn = open_memory_database().unwrap();
        let reviewer = seed_reviewer(&conn, "doc@example.com", ReviewerRole::Physician, 500);
        let a = seed_assessment(&conn, "Ana", ts(1, 9));
        record_assessment_decision(
            &conn,
            &a.id,
            Decision::Denied,
            &reviewer.id,
            Some("note"),
            Some("uncontrolled hypertension"),
            &ts(2, 9),
        )
        .unwrap();

        let stored = get_assessment(&conn, &a.id).unwrap().unwrap();
        assert_eq!(stored.status, AssessmentStatus::Denied);
        assert_eq!(stored.reviewer_id, Some(reviewer.id));
        assert_eq!(stored.denial_reason.as_deref(), Some("uncontrolled hypertension"));
        assert_eq!(stored.decided_at, Some(ts(2, 9)));

        let again = record_assessment_decision(
            &conn,
            &a.id,
            Decision::Approved,
            &reviewer.id,
            None,
            None,
            &ts(3, 9),
        );
        assert!(matches!(again, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn shipment_requires_approved_status() {
        let conn = open_memory_database().unwrap();
        let reviewer = seed_reviewer(&conn, "doc@example.com", ReviewerRole::Physician, 500);
        let a = seed_assessment(&conn, "Ana", ts(1, 9));
        assert!(record_assessment_shipment(&conn, &a.id, None, &ts(2, 9)).is_err());

        record_assessment_decision(&conn, &a.id, Decision::Approved, &reviewer.id, None, None, &ts(2, 9))
            .unwrap();
        record_assessment_shipment(&conn, &a.id, Some("1Z999"), &ts(3, 9)).unwrap();

        let stored = get_assessment(&conn, &a.id).unwrap().unwrap();
        assert_eq!(stored.status, AssessmentStatus::Shipped);
        assert_eq!(stored.tracking_number.as_deref(), Some("1Z999"));
        assert_eq!(stored.shipped_at, Some(ts(3, 9)));
    }
}
