//! Reviewer workflow: the assessment queue, the detail view, and decisions.
//!
//! Every read is audited. A decision is atomic: the status change, the
//! reviewer's payment with its cycle totals, and the audit entry commit
//! together or not at all.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{
    add_to_cycle_totals, count_assessments_by_status, find_or_create_payout_cycle, get_assessment,
    get_or_create_settings, get_reviewer, insert_audit_entry, insert_review_payment,
    list_assessments, record_assessment_decision, DatabaseError,
};
use crate::models::enums::{AssessmentStatus, AuditAction, Decision, EntityType, ReviewerStatus};
use crate::models::{Assessment, AuditEntry, PayoutWindow, ReviewPayment, Reviewer};
use crate::screening::{FlagType, RiskFlag};

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Assessment not found: {0}")]
    AssessmentNotFound(Uuid),

    #[error("Reviewer not found: {0}")]
    ReviewerNotFound(Uuid),

    #[error("Reviewer {0} is not an active, approved reviewer")]
    ReviewerInactive(Uuid),

    #[error("Assessment has already been {0}")]
    AlreadyDecided(AssessmentStatus),

    #[error("Denial reason is required when denying an assessment")]
    DenialReasonRequired,

    #[error("Payout window ends before it starts")]
    InvalidWindow,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Only(AssessmentStatus),
}

impl StatusFilter {
    fn status(&self) -> Option<AssessmentStatus> {
        match self {
            Self::All => None,
            Self::Only(status) => Some(*status),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueFilter {
    pub status: StatusFilter,
    /// Case-insensitive match against patient name or email.
    pub search: Option<String>,
}

/// Minimal reviewer identity shown next to an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&Reviewer> for ReviewerRef {
    fn from(r: &Reviewer) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            email: r.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub created_at: NaiveDateTime,
    pub patient_name: String,
    pub patient_email: Option<String>,
    pub status: AssessmentStatus,
    pub is_auto_disqualified: bool,
    pub risk_flags: Vec<RiskFlag>,
    pub disqualifiers: usize,
    pub cautions: usize,
    pub reviewer: Option<ReviewerRef>,
    pub decided_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub denied: i64,
    pub shipped: i64,
    pub all: i64,
}

impl StatusCounts {
    fn add(&mut self, status: AssessmentStatus, count: i64) {
        match status {
            AssessmentStatus::Pending => self.pending += count,
            AssessmentStatus::Approved => self.approved += count,
            AssessmentStatus::Denied => self.denied += count,
            AssessmentStatus::Shipped => self.shipped += count,
        }
        self.all += count;
    }

    pub fn get(&self, filter: StatusFilter) -> i64 {
        match filter.status() {
            None => self.all,
            Some(AssessmentStatus::Pending) => self.pending,
            Some(AssessmentStatus::Approved) => self.approved,
            Some(AssessmentStatus::Denied) => self.denied,
            Some(AssessmentStatus::Shipped) => self.shipped,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewQueue {
    pub items: Vec<QueueItem>,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentDetail {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub reviewer: Option<ReviewerRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub assessment_id: Uuid,
    pub decision: Decision,
    pub notes: Option<String>,
    pub denial_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub assessment_id: Uuid,
    pub status: AssessmentStatus,
    pub decided_at: NaiveDateTime,
    pub payment: Option<ReviewPayment>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// The acting reviewer must exist, be approved, and be active.
pub(crate) fn require_active_reviewer(conn: &Connection, id: &Uuid) -> Result<Reviewer, ReviewError> {
    let reviewer = get_reviewer(conn, id)?.ok_or(ReviewError::ReviewerNotFound(*id))?;
    if !reviewer.is_active || reviewer.status != ReviewerStatus::Approved {
        tracing::warn!(reviewer_id = %id, "Inactive reviewer rejected");
        return Err(ReviewError::ReviewerInactive(*id));
    }
    Ok(reviewer)
}

fn matches_search(assessment: &Assessment, needle: &str) -> bool {
    let name = assessment.sections.patient_name().to_lowercase();
    let email = assessment
        .sections
        .patient_email()
        .unwrap_or_default()
        .to_lowercase();
    name.contains(needle) || email.contains(needle)
}

fn count_tier(flags: &[RiskFlag], tier: FlagType) -> usize {
    flags.iter().filter(|f| f.flag_type == tier).count()
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Assessments newest first, filtered by status and search, with counts per
/// status across the whole table.
pub fn list_queue(
    conn: &Connection,
    reviewer_id: &Uuid,
    filter: &QueueFilter,
    now: NaiveDateTime,
) -> Result<ReviewQueue, ReviewError> {
    require_active_reviewer(conn, reviewer_id)?;

    let needle = non_blank(filter.search.as_deref()).map(str::to_lowercase);
    let assessments = list_assessments(conn, filter.status.status())?;

    let mut reviewers: HashMap<Uuid, Option<ReviewerRef>> = HashMap::new();
    let mut items = Vec::with_capacity(assessments.len());
    for a in assessments {
        if let Some(needle) = &needle {
            if !matches_search(&a, needle) {
                continue;
            }
        }
        let reviewer = match a.reviewer_id {
            Some(id) => {
                if !reviewers.contains_key(&id) {
                    let found = get_reviewer(conn, &id)?.as_ref().map(ReviewerRef::from);
                    reviewers.insert(id, found);
                }
                reviewers.get(&id).cloned().flatten()
            }
            None => None,
        };
        items.push(QueueItem {
            id: a.id,
            created_at: a.created_at,
            patient_name: a.sections.patient_name(),
            patient_email: a.sections.patient_email().map(String::from),
            status: a.status,
            is_auto_disqualified: a.is_auto_disqualified,
            disqualifiers: count_tier(&a.risk_flags, FlagType::Disqualifier),
            cautions: count_tier(&a.risk_flags, FlagType::Caution),
            risk_flags: a.risk_flags,
            reviewer,
            decided_at: a.decided_at,
        });
    }

    let mut counts = StatusCounts::default();
    for (status, count) in count_assessments_by_status(conn)? {
        counts.add(status, count);
    }

    insert_audit_entry(
        conn,
        &AuditEntry::new(AuditAction::ViewQueue, EntityType::Assessment, now)
            .by(*reviewer_id)
            .details(json!({
                "status": filter.status.status().map(|s| s.as_str()).unwrap_or("all"),
                "search": needle,
            })),
    )?;

    Ok(ReviewQueue { items, counts })
}

/// Full assessment for the decision view.
pub fn get_assessment_detail(
    conn: &Connection,
    reviewer_id: &Uuid,
    assessment_id: &Uuid,
    now: NaiveDateTime,
) -> Result<AssessmentDetail, ReviewError> {
    require_active_reviewer(conn, reviewer_id)?;

    let assessment =
        get_assessment(conn, assessment_id)?.ok_or(ReviewError::AssessmentNotFound(*assessment_id))?;
    let reviewer = match assessment.reviewer_id {
        Some(id) => get_reviewer(conn, &id)?.as_ref().map(ReviewerRef::from),
        None => None,
    };

    insert_audit_entry(
        conn,
        &AuditEntry::new(AuditAction::View, EntityType::Assessment, now)
            .entity(*assessment_id)
            .by(*reviewer_id),
    )?;

    Ok(AssessmentDetail { assessment, reviewer })
}

/// Approve or deny a pending assessment and credit the reviewer's fee to the
/// payout cycle covering `window`.
pub fn record_decision(
    conn: &Connection,
    reviewer_id: &Uuid,
    request: &DecisionRequest,
    window: PayoutWindow,
    now: NaiveDateTime,
) -> Result<DecisionOutcome, ReviewError> {
    let notes = non_blank(request.notes.as_deref());
    let denial_reason = match request.decision {
        Decision::Denied => Some(
            non_blank(request.denial_reason.as_deref()).ok_or(ReviewError::DenialReasonRequired)?,
        ),
        Decision::Approved => None,
    };
    if window.end < window.start {
        return Err(ReviewError::InvalidWindow);
    }

    let tx = conn.unchecked_transaction()?;

    let assessment = get_assessment(&tx, &request.assessment_id)?
        .ok_or(ReviewError::AssessmentNotFound(request.assessment_id))?;
    if assessment.status != AssessmentStatus::Pending {
        tracing::warn!(
            assessment_id = %assessment.id,
            status = assessment.status.as_str(),
            "Decision on already decided assessment rejected"
        );
        return Err(ReviewError::AlreadyDecided(assessment.status));
    }
    let reviewer = require_active_reviewer(&tx, reviewer_id)?;

    record_assessment_decision(
        &tx,
        &assessment.id,
        request.decision,
        reviewer_id,
        notes,
        denial_reason,
        &now,
    )?;

    let payment = if reviewer.fee_per_review_cents > 0 {
        let settings = get_or_create_settings(&tx)?;
        let cycle =
            find_or_create_payout_cycle(&tx, reviewer_id, &window, settings.payout_cycle_type, &now)?;
        let payment = ReviewPayment {
            id: Uuid::new_v4(),
            assessment_id: assessment.id,
            reviewer_id: *reviewer_id,
            cycle_id: cycle.id,
            amount_cents: reviewer.fee_per_review_cents,
            decision: request.decision,
            is_paid: false,
            paid_at: None,
            created_at: now,
        };
        insert_review_payment(&tx, &payment)?;
        add_to_cycle_totals(&tx, &cycle.id, payment.amount_cents)?;
        Some(payment)
    } else {
        None
    };

    insert_audit_entry(
        &tx,
        &AuditEntry::new(request.decision.audit_action(), EntityType::Assessment, now)
            .entity(assessment.id)
            .by(*reviewer_id)
            .details(json!({
                "notes": notes,
                "denialReason": denial_reason,
                "paymentAmountCents": payment.as_ref().map_or(0, |p| p.amount_cents),
            })),
    )?;

    tx.commit()?;

    tracing::info!(
        assessment_id = %assessment.id,
        reviewer_id = %reviewer_id,
        decision = request.decision.as_str(),
        fee_cents = payment.as_ref().map_or(0, |p| p.amount_cents),
        "Decision recorded"
    );

    Ok(DecisionOutcome {
        assessment_id: assessment.id,
        status: request.decision.status(),
        decided_at: now,
        payment,
    })
}
