use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_ts, parse_opt_ts, parse_opt_uuid, parse_ts, parse_uuid, require_updated};
use crate::db::DatabaseError;
use crate::models::enums::{ReviewerRole, ReviewerStatus};
use crate::models::{Reviewer, ReviewerOverview};

const REVIEWER_COLUMNS: &str = "id, name, email, license_number, role, status, is_active,
    fee_per_review_cents, created_at, approved_at, approved_by";

struct ReviewerRow {
    id: String,
    name: String,
    email: String,
    license_number: Option<String>,
    role: String,
    status: String,
    is_active: i32,
    fee_per_review_cents: i64,
    created_at: String,
    approved_at: Option<String>,
    approved_by: Option<String>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<ReviewerRow> {
    Ok(ReviewerRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        license_number: row.get(3)?,
        role: row.get(4)?,
        status: row.get(5)?,
        is_active: row.get(6)?,
        fee_per_review_cents: row.get(7)?,
        created_at: row.get(8)?,
        approved_at: row.get(9)?,
        approved_by: row.get(10)?,
    })
}

fn reviewer_from_row(row: ReviewerRow) -> Result<Reviewer, DatabaseError> {
    Ok(Reviewer {
        id: parse_uuid("reviewers.id", &row.id)?,
        name: row.name,
        email: row.email,
        license_number: row.license_number,
        role: ReviewerRole::from_str(&row.role)?,
        status: ReviewerStatus::from_str(&row.status)?,
        is_active: row.is_active != 0,
        fee_per_review_cents: row.fee_per_review_cents,
        created_at: parse_ts("reviewers.created_at", &row.created_at)?,
        approved_at: parse_opt_ts("reviewers.approved_at", row.approved_at)?,
        approved_by: parse_opt_uuid("reviewers.approved_by", row.approved_by)?,
    })
}

pub fn insert_reviewer(conn: &Connection, r: &Reviewer) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO reviewers ({REVIEWER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            r.id.to_string(),
            r.name,
            r.email,
            r.license_number,
            r.role.as_str(),
            r.status.as_str(),
            r.is_active as i32,
            r.fee_per_review_cents,
            format_ts(&r.created_at),
            r.approved_at.as_ref().map(format_ts),
            r.approved_by.map(|id| id.to_string()),
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation(format!("reviewer email {} already registered", r.email))
        }
        other => DatabaseError::Sqlite(other),
    })?;
    Ok(())
}

pub fn get_reviewer(conn: &Connection, id: &Uuid) -> Result<Option<Reviewer>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {REVIEWER_COLUMNS} FROM reviewers WHERE id = ?1"),
            params![id.to_string()],
            read_row,
        )
        .optional()?;
    row.map(reviewer_from_row).transpose()
}

/// Emails are stored lower-cased; `email` must already be normalized.
pub fn get_reviewer_by_email(conn: &Connection, email: &str) -> Result<Option<Reviewer>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {REVIEWER_COLUMNS} FROM reviewers WHERE email = ?1"),
            params![email],
            read_row,
        )
        .optional()?;
    row.map(reviewer_from_row).transpose()
}

/// All reviewers newest first, with assessment and payment counts.
pub fn list_reviewer_overviews(conn: &Connection) -> Result<Vec<ReviewerOverview>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REVIEWER_COLUMNS},
            (SELECT COUNT(*) FROM assessments a WHERE a.reviewer_id = reviewers.id),
            (SELECT COUNT(*) FROM review_payments p WHERE p.reviewer_id = reviewers.id)
         FROM reviewers
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((read_row(row)?, row.get::<_, i64>(11)?, row.get::<_, i64>(12)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(row, assessment_count, payment_count)| {
            Ok(ReviewerOverview {
                reviewer: reviewer_from_row(row)?,
                assessment_count,
                payment_count,
            })
        })
        .collect()
}

pub fn mark_reviewer_approved(
    conn: &Connection,
    id: &Uuid,
    approved_by: &Uuid,
    fee_per_review_cents: i64,
    approved_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE reviewers
         SET status = 'approved', is_active = 1, approved_at = ?2, approved_by = ?3,
             fee_per_review_cents = ?4
         WHERE id = ?1",
        params![
            id.to_string(),
            format_ts(approved_at),
            approved_by.to_string(),
            fee_per_review_cents,
        ],
    )?;
    require_updated(changed, "Reviewer", id)
}

pub fn mark_reviewer_denied(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE reviewers SET status = 'denied', is_active = 0 WHERE id = ?1",
        params![id.to_string()],
    )?;
    require_updated(changed, "Reviewer", id)
}

pub fn set_reviewer_active_flag(conn: &Connection, id: &Uuid, active: bool) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE reviewers SET is_active = ?2 WHERE id = ?1",
        params![id.to_string(), active as i32],
    )?;
    require_updated(changed, "Reviewer", id)
}

pub fn set_reviewer_fee(conn: &Connection, id: &Uuid, fee_cents: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE reviewers SET fee_per_review_cents = ?2 WHERE id = ?1",
        params![id.to_string(), fee_cents],
    )?;
    require_updated(changed, "Reviewer", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::repository::record_assessment_decision;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Decision;

    #[test]
    fn insert_and_lookup_by_id_and_email() {
        let conn = open_memory_database().unwrap();
        let r = seed_reviewer(&conn, "house@example.com", ReviewerRole::Physician, 750);

        let by_id = get_reviewer(&conn, &r.id).unwrap().unwrap();
        assert_eq!(by_id.email, "house@example.com");
        assert_eq!(by_id.fee_per_review_cents, 750);
        assert!(by_id.is_active);

        let by_email = get_reviewer_by_email(&conn, "house@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, r.id);
        assert!(get_reviewer_by_email(&conn, "nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn email_is_unique() {
        let conn = open_memory_database().unwrap();
        seed_reviewer(&conn, "dup@example.com", ReviewerRole::Physician, 500);
        let again = reviewer("dup@example.com", ReviewerRole::Physician, 500);
        assert!(matches!(
            insert_reviewer(&conn, &again),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn overview_counts_activity() {
        let conn = open_memory_database().unwrap();
        let r = seed_reviewer(&conn, "doc@example.com", ReviewerRole::Physician, 500);
        let a = seed_assessment(&conn, "Ana", ts(2, 9));
        record_assessment_decision(&conn, &a.id, Decision::Approved, &r.id, None, None, &ts(2, 10))
            .unwrap();

        let overviews = list_reviewer_overviews(&conn).unwrap();
        assert_eq!(overviews.len(), 1);
        assert_eq!(overviews[0].assessment_count, 1);
        assert_eq!(overviews[0].payment_count, 0);
    }

    #[test]
    fn approval_and_denial_update_status() {
        let conn = open_memory_database().unwrap();
        let admin = seed_reviewer(&conn, "admin@example.com", ReviewerRole::Admin, 0);
        let r = seed_reviewer(&conn, "new@example.com", ReviewerRole::Physician, 100);

        mark_reviewer_approved(&conn, &r.id, &admin.id, 500, &ts(5, 9)).unwrap();
        let approved = get_reviewer(&conn, &r.id).unwrap().unwrap();
        assert_eq!(approved.status, ReviewerStatus::Approved);
        assert_eq!(approved.approved_by, Some(admin.id));
        assert_eq!(approved.fee_per_review_cents, 500);

        mark_reviewer_denied(&conn, &r.id).unwrap();
        let denied = get_reviewer(&conn, &r.id).unwrap().unwrap();
        assert_eq!(denied.status, ReviewerStatus::Denied);
        assert!(!denied.is_active);
    }

    #[test]
    fn updates_on_missing_reviewer_are_not_found() {
        let conn = open_memory_database().unwrap();
        let ghost = Uuid::new_v4();
        assert!(matches!(
            set_reviewer_fee(&conn, &ghost, 100),
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(
            set_reviewer_active_flag(&conn, &ghost, true),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
