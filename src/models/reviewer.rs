use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ReviewerRole, ReviewerStatus};

/// A licensed clinician who reviews assessments, or an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub license_number: Option<String>,
    pub role: ReviewerRole,
    pub status: ReviewerStatus,
    pub is_active: bool,
    pub fee_per_review_cents: i64,
    pub created_at: NaiveDateTime,
    pub approved_at: Option<NaiveDateTime>,
    pub approved_by: Option<Uuid>,
}

impl Reviewer {
    pub fn is_admin(&self) -> bool {
        self.role == ReviewerRole::Admin
    }
}

/// Reviewer row for the admin roster, with activity counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerOverview {
    pub reviewer: Reviewer,
    pub assessment_count: i64,
    pub payment_count: i64,
}
