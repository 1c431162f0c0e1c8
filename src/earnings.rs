//! Reviewer earnings dashboard.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{get_reviewer, list_reviewer_cycles, list_reviewer_payments};
use crate::models::enums::Decision;
use crate::models::{PayoutCycle, ReviewPayment};
use crate::review::ReviewError;

pub const RECENT_CYCLES: usize = 12;
pub const RECENT_PAYMENTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsSummary {
    pub total_earnings_cents: i64,
    pub paid_out_cents: i64,
    pub pending_balance_cents: i64,
    pub total_reviews: usize,
    pub approved_count: usize,
    pub denied_count: usize,
    pub this_month_cents: i64,
    pub fee_per_review_cents: i64,
    pub cycles: Vec<PayoutCycle>,
    pub recent_payments: Vec<ReviewPayment>,
}

fn sum_cents<'a>(payments: impl Iterator<Item = &'a ReviewPayment>) -> i64 {
    payments.map(|p| p.amount_cents).sum()
}

/// Lifetime totals for one reviewer plus earnings since `month_start`.
pub fn earnings_summary(
    conn: &Connection,
    reviewer_id: &Uuid,
    month_start: NaiveDateTime,
) -> Result<EarningsSummary, ReviewError> {
    let reviewer = get_reviewer(conn, reviewer_id)?.ok_or(ReviewError::ReviewerNotFound(*reviewer_id))?;
    let payments = list_reviewer_payments(conn, reviewer_id)?;

    let total_earnings_cents = sum_cents(payments.iter());
    let paid_out_cents = sum_cents(payments.iter().filter(|p| p.is_paid));
    let this_month_cents = sum_cents(payments.iter().filter(|p| p.created_at >= month_start));
    let count = |d: Decision| payments.iter().filter(|p| p.decision == d).count();

    Ok(EarningsSummary {
        total_earnings_cents,
        paid_out_cents,
        pending_balance_cents: total_earnings_cents - paid_out_cents,
        total_reviews: payments.len(),
        approved_count: count(Decision::Approved),
        denied_count: count(Decision::Denied),
        this_month_cents,
        fee_per_review_cents: reviewer.fee_per_review_cents,
        cycles: list_reviewer_cycles(conn, reviewer_id, RECENT_CYCLES)?,
        recent_payments: payments.into_iter().take(RECENT_PAYMENTS).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::{open_memory_database, settle_payout_cycle};
    use crate::models::enums::ReviewerRole;
    use crate::models::PayoutWindow;
    use crate::review::{record_decision, DecisionRequest};

    fn decide(conn: &Connection, reviewer_id: &Uuid, decision: Decision, window_start: u32, at: NaiveDateTime) -> ReviewPayment {
        let id = seed_assessment(conn, "Pat", at).id;
        let request = DecisionRequest {
            assessment_id: id,
            decision,
            notes: None,
            denial_reason: (decision == Decision::Denied).then(|| "Contraindicated".to_string()),
        };
        let window = PayoutWindow {
            start: ts(window_start, 0),
            end: ts(window_start + 6, 23),
        };
        record_decision(conn, reviewer_id, &request, window, at)
            .unwrap()
            .payment
            .unwrap()
    }

    #[test]
    fn new_reviewer_has_empty_summary() {
        let conn = open_memory_database().unwrap();
        let doc = seed_reviewer(&conn, "doc@example.com", ReviewerRole::Physician, 500);
        let summary = earnings_summary(&conn, &doc.id, ts(1, 0)).unwrap();
        assert_eq!(summary.total_earnings_cents, 0);
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.fee_per_review_cents, 500);
        assert!(summary.cycles.is_empty());
    }

    #[test]
    fn totals_split_paid_and_pending() {
        let conn = open_memory_database().unwrap();
        let admin = seed_reviewer(&conn, "admin@example.com", ReviewerRole::Admin, 0);
        let doc = seed_reviewer(&conn, "doc@example.com", ReviewerRole::Physician, 500);

        let early = decide(&conn, &doc.id, Decision::Approved, 3, ts(4, 9));
        decide(&conn, &doc.id, Decision::Denied, 10, ts(11, 9));
        decide(&conn, &doc.id, Decision::Approved, 10, ts(12, 9));
        settle_payout_cycle(&conn, &early.cycle_id, &admin.id, None, &ts(10, 9)).unwrap();

        let summary = earnings_summary(&conn, &doc.id, ts(10, 0)).unwrap();
        assert_eq!(summary.total_earnings_cents, 1500);
        assert_eq!(summary.paid_out_cents, 500);
        assert_eq!(summary.pending_balance_cents, 1000);
        assert_eq!(summary.total_reviews, 3);
        assert_eq!(summary.approved_count, 2);
        assert_eq!(summary.denied_count, 1);
        assert_eq!(summary.this_month_cents, 1000);
        assert_eq!(summary.cycles.len(), 2);
        assert_eq!(summary.cycles[0].start_date, ts(10, 0));
        assert_eq!(summary.recent_payments[0].created_at, ts(12, 9));
    }

    #[test]
    fn unknown_reviewer_is_reported() {
        let conn = open_memory_database().unwrap();
        let result = earnings_summary(&conn, &Uuid::new_v4(), ts(1, 0));
        assert!(matches!(result, Err(ReviewError::ReviewerNotFound(_))));
    }
}
