use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{CycleStatus, CycleType, Decision};

/// Inclusive bounds of the payout period a decision is credited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// One reviewer's earnings over one payout period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutCycle {
    pub id: Uuid,
    pub reviewer_id: Uuid,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub cycle_type: CycleType,
    pub status: CycleStatus,
    pub total_reviews: i64,
    pub total_amount_cents: i64,
    pub paid_at: Option<NaiveDateTime>,
    pub paid_by: Option<Uuid>,
    pub payment_notes: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Fee credited for a single decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPayment {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub reviewer_id: Uuid,
    pub cycle_id: Uuid,
    pub amount_cents: i64,
    pub decision: Decision,
    pub is_paid: bool,
    pub paid_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}
