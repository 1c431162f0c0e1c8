use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_ts, parse_opt_ts, parse_opt_uuid, parse_ts, parse_uuid, require_updated};
use crate::db::DatabaseError;
use crate::models::enums::{CycleStatus, CycleType, Decision};
use crate::models::{PayoutCycle, PayoutWindow, ReviewPayment};

// ═══════════════════════════════════════════
// Payout cycles
// ═══════════════════════════════════════════

const CYCLE_COLUMNS: &str = "id, reviewer_id, start_date, end_date, cycle_type, status,
    total_reviews, total_amount_cents, paid_at, paid_by, payment_notes, created_at";

struct CycleRow {
    id: String,
    reviewer_id: String,
    start_date: String,
    end_date: String,
    cycle_type: String,
    status: String,
    total_reviews: i64,
    total_amount_cents: i64,
    paid_at: Option<String>,
    paid_by: Option<String>,
    payment_notes: Option<String>,
    created_at: String,
}

fn read_cycle_row(row: &Row<'_>) -> rusqlite::Result<CycleRow> {
    Ok(CycleRow {
        id: row.get(0)?,
        reviewer_id: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        cycle_type: row.get(4)?,
        status: row.get(5)?,
        total_reviews: row.get(6)?,
        total_amount_cents: row.get(7)?,
        paid_at: row.get(8)?,
        paid_by: row.get(9)?,
        payment_notes: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn cycle_from_row(row: CycleRow) -> Result<PayoutCycle, DatabaseError> {
    Ok(PayoutCycle {
        id: parse_uuid("payout_cycles.id", &row.id)?,
        reviewer_id: parse_uuid("payout_cycles.reviewer_id", &row.reviewer_id)?,
        start_date: parse_ts("payout_cycles.start_date", &row.start_date)?,
        end_date: parse_ts("payout_cycles.end_date", &row.end_date)?,
        cycle_type: CycleType::from_str(&row.cycle_type)?,
        status: CycleStatus::from_str(&row.status)?,
        total_reviews: row.total_reviews,
        total_amount_cents: row.total_amount_cents,
        paid_at: parse_opt_ts("payout_cycles.paid_at", row.paid_at)?,
        paid_by: parse_opt_uuid("payout_cycles.paid_by", row.paid_by)?,
        payment_notes: row.payment_notes,
        created_at: parse_ts("payout_cycles.created_at", &row.created_at)?,
    })
}

pub fn insert_payout_cycle(conn: &Connection, c: &PayoutCycle) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO payout_cycles ({CYCLE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            c.id.to_string(),
            c.reviewer_id.to_string(),
            format_ts(&c.start_date),
            format_ts(&c.end_date),
            c.cycle_type.as_str(),
            c.status.as_str(),
            c.total_reviews,
            c.total_amount_cents,
            c.paid_at.as_ref().map(format_ts),
            c.paid_by.map(|id| id.to_string()),
            c.payment_notes,
            format_ts(&c.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_payout_cycle(conn: &Connection, id: &Uuid) -> Result<Option<PayoutCycle>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {CYCLE_COLUMNS} FROM payout_cycles WHERE id = ?1"),
            params![id.to_string()],
            read_cycle_row,
        )
        .optional()?;
    row.map(cycle_from_row).transpose()
}

/// The reviewer's open cycle covering exactly `window`, if one exists.
/// Paid cycles for the same window are never returned.
pub fn find_open_payout_cycle(
    conn: &Connection,
    reviewer_id: &Uuid,
    window: &PayoutWindow,
) -> Result<Option<PayoutCycle>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {CYCLE_COLUMNS} FROM payout_cycles
                 WHERE reviewer_id = ?1 AND start_date = ?2 AND end_date = ?3
                   AND status = 'open'"
            ),
            params![
                reviewer_id.to_string(),
                format_ts(&window.start),
                format_ts(&window.end),
            ],
            read_cycle_row,
        )
        .optional()?;
    row.map(cycle_from_row).transpose()
}

/// Reuse the reviewer's open cycle for `window` or open a new one.
pub fn find_or_create_payout_cycle(
    conn: &Connection,
    reviewer_id: &Uuid,
    window: &PayoutWindow,
    cycle_type: CycleType,
    now: &NaiveDateTime,
) -> Result<PayoutCycle, DatabaseError> {
    if let Some(existing) = find_open_payout_cycle(conn, reviewer_id, window)? {
        return Ok(existing);
    }

    let cycle = PayoutCycle {
        id: Uuid::new_v4(),
        reviewer_id: *reviewer_id,
        start_date: window.start,
        end_date: window.end,
        cycle_type,
        status: CycleStatus::Open,
        total_reviews: 0,
        total_amount_cents: 0,
        paid_at: None,
        paid_by: None,
        payment_notes: None,
        created_at: *now,
    };
    insert_payout_cycle(conn, &cycle)?;
    tracing::info!(
        cycle_id = %cycle.id,
        reviewer_id = %reviewer_id,
        cycle_type = cycle_type.as_str(),
        "Opened payout cycle"
    );
    Ok(cycle)
}

/// Credit one review of `amount_cents` to an open cycle's totals.
pub fn add_to_cycle_totals(conn: &Connection, cycle_id: &Uuid, amount_cents: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE payout_cycles
         SET total_reviews = total_reviews + 1, total_amount_cents = total_amount_cents + ?2
         WHERE id = ?1 AND status = 'open'",
        params![cycle_id.to_string(), amount_cents],
    )?;
    require_updated(changed, "open PayoutCycle", cycle_id)
}

/// Every cycle with its payment count: open first, then closed, then paid;
/// newest start first within a status.
pub fn list_payout_cycles_with_counts(conn: &Connection) -> Result<Vec<(PayoutCycle, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CYCLE_COLUMNS},
            (SELECT COUNT(*) FROM review_payments p WHERE p.cycle_id = payout_cycles.id)
         FROM payout_cycles
         ORDER BY CASE status WHEN 'open' THEN 0 WHEN 'closed' THEN 1 ELSE 2 END,
                  start_date DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map([], |row| Ok((read_cycle_row(row)?, row.get::<_, i64>(12)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(row, count)| Ok((cycle_from_row(row)?, count)))
        .collect()
}

/// The reviewer's most recent cycles, newest start first.
pub fn list_reviewer_cycles(
    conn: &Connection,
    reviewer_id: &Uuid,
    limit: usize,
) -> Result<Vec<PayoutCycle>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CYCLE_COLUMNS} FROM payout_cycles
         WHERE reviewer_id = ?1
         ORDER BY start_date DESC, rowid DESC
         LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(params![reviewer_id.to_string(), limit as i64], read_cycle_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(cycle_from_row).collect()
}

/// Close out a cycle: the cycle and every unpaid payment in it become paid.
/// Returns the number of payments settled. A cycle that is already paid is
/// left untouched and reported as a `ConstraintViolation`.
pub fn settle_payout_cycle(
    conn: &Connection,
    cycle_id: &Uuid,
    paid_by: &Uuid,
    notes: Option<&str>,
    paid_at: &NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let cycle = get_payout_cycle(conn, cycle_id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "PayoutCycle".into(),
        id: cycle_id.to_string(),
    })?;
    if cycle.status == CycleStatus::Paid {
        return Err(DatabaseError::ConstraintViolation(format!(
            "payout cycle {cycle_id} is already paid"
        )));
    }

    let changed = conn.execute(
        "UPDATE payout_cycles
         SET status = 'paid', paid_at = ?2, paid_by = ?3, payment_notes = ?4
         WHERE id = ?1 AND status != 'paid'",
        params![
            cycle_id.to_string(),
            format_ts(paid_at),
            paid_by.to_string(),
            notes,
        ],
    )?;
    require_updated(changed, "PayoutCycle", cycle_id)?;

    let settled = conn.execute(
        "UPDATE review_payments SET is_paid = 1, paid_at = ?2 WHERE cycle_id = ?1 AND is_paid = 0",
        params![cycle_id.to_string(), format_ts(paid_at)],
    )?;
    Ok(settled)
}

// ═══════════════════════════════════════════
// Review payments
// ═══════════════════════════════════════════

const PAYMENT_COLUMNS: &str = "id, assessment_id, reviewer_id, cycle_id, amount_cents, decision,
    is_paid, paid_at, created_at";

struct PaymentRow {
    id: String,
    assessment_id: String,
    reviewer_id: String,
    cycle_id: String,
    amount_cents: i64,
    decision: String,
    is_paid: i32,
    paid_at: Option<String>,
    created_at: String,
}

fn read_payment_row(row: &Row<'_>) -> rusqlite::Result<PaymentRow> {
    Ok(PaymentRow {
        id: row.get(0)?,
        assessment_id: row.get(1)?,
        reviewer_id: row.get(2)?,
        cycle_id: row.get(3)?,
        amount_cents: row.get(4)?,
        decision: row.get(5)?,
        is_paid: row.get(6)?,
        paid_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn payment_from_row(row: PaymentRow) -> Result<ReviewPayment, DatabaseError> {
    Ok(ReviewPayment {
        id: parse_uuid("review_payments.id", &row.id)?,
        assessment_id: parse_uuid("review_payments.assessment_id", &row.assessment_id)?,
        reviewer_id: parse_uuid("review_payments.reviewer_id", &row.reviewer_id)?,
        cycle_id: parse_uuid("review_payments.cycle_id", &row.cycle_id)?,
        amount_cents: row.amount_cents,
        decision: Decision::from_str(&row.decision)?,
        is_paid: row.is_paid != 0,
        paid_at: parse_opt_ts("review_payments.paid_at", row.paid_at)?,
        created_at: parse_ts("review_payments.created_at", &row.created_at)?,
    })
}

pub fn insert_review_payment(conn: &Connection, p: &ReviewPayment) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO review_payments ({PAYMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        params![
            p.id.to_string(),
            p.assessment_id.to_string(),
            p.reviewer_id.to_string(),
            p.cycle_id.to_string(),
            p.amount_cents,
            p.decision.as_str(),
            p.is_paid as i32,
            p.paid_at.as_ref().map(format_ts),
            format_ts(&p.created_at),
        ],
    )?;
    Ok(())
}

/// All of a reviewer's payments, newest first.
pub fn list_reviewer_payments(conn: &Connection, reviewer_id: &Uuid) -> Result<Vec<ReviewPayment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM review_payments
         WHERE reviewer_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map(params![reviewer_id.to_string()], read_payment_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(payment_from_row).collect()
}

pub fn list_cycle_payments(conn: &Connection, cycle_id: &Uuid) -> Result<Vec<ReviewPayment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM review_payments
         WHERE cycle_id = ?1
         ORDER BY created_at, rowid"
    ))?;
    let rows = stmt
        .query_map(params![cycle_id.to_string()], read_payment_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(payment_from_row).collect()
}
