//! Administration: reviewer onboarding, fees, system settings, payouts and
//! fulfillment.
//!
//! Every operation except registration is performed by an acting reviewer
//! who must hold the admin role. Each mutation is written to the audit log
//! in the same transaction as the change.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{
    get_assessment, get_or_create_settings, get_payout_cycle, get_reviewer, get_reviewer_by_email,
    insert_audit_entry, insert_reviewer, list_payout_cycles_with_counts, list_reviewer_overviews,
    mark_reviewer_approved, mark_reviewer_denied, record_assessment_shipment, save_settings,
    set_reviewer_active_flag, set_reviewer_fee, settle_payout_cycle, DatabaseError,
};
use crate::models::enums::{
    AssessmentStatus, AuditAction, CycleStatus, EntityType, ReviewerRole, ReviewerStatus,
};
use crate::models::{
    Assessment, AuditEntry, PayoutCycle, Reviewer, ReviewerOverview, SettingsPatch, SystemSettings,
};
use crate::review::ReviewerRef;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Admin access required")]
    Forbidden,

    #[error("Acting reviewer not found: {0}")]
    ActorNotFound(Uuid),

    #[error("Reviewer not found: {0}")]
    ReviewerNotFound(Uuid),

    #[error("Assessment not found: {0}")]
    AssessmentNotFound(Uuid),

    #[error("Payout cycle not found: {0}")]
    CycleNotFound(Uuid),

    #[error("Payout cycle {0} has already been paid")]
    CycleAlreadyPaid(Uuid),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("An account with email {0} already exists")]
    EmailTaken(String),

    #[error("Invalid fee amount: {0} cents")]
    InvalidFee(i64),

    #[error("Only approved assessments can be marked as shipped (status is {0})")]
    NotShippable(AssessmentStatus),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub license_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleOverview {
    pub cycle: PayoutCycle,
    pub reviewer: Option<ReviewerRef>,
    pub payment_count: i64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_admin(conn: &Connection, actor_id: &Uuid) -> Result<Reviewer, AdminError> {
    let actor = get_reviewer(conn, actor_id)?.ok_or(AdminError::ActorNotFound(*actor_id))?;
    if !actor.is_admin() || !actor.is_active {
        tracing::warn!(actor_id = %actor_id, "Admin operation rejected");
        return Err(AdminError::Forbidden);
    }
    Ok(actor)
}

fn load_reviewer(conn: &Connection, id: &Uuid) -> Result<Reviewer, AdminError> {
    get_reviewer(conn, id)?.ok_or(AdminError::ReviewerNotFound(*id))
}

fn validate_fee(fee_cents: i64) -> Result<i64, AdminError> {
    if fee_cents < 0 {
        return Err(AdminError::InvalidFee(fee_cents));
    }
    Ok(fee_cents)
}

fn trimmed(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// Reviewers
// ---------------------------------------------------------------------------

/// Self-registration. The account starts pending and inactive until an
/// admin approves it.
pub fn register_reviewer(
    conn: &Connection,
    registration: &Registration,
    now: NaiveDateTime,
) -> Result<Reviewer, AdminError> {
    let name = trimmed(Some(registration.name.as_str())).ok_or(AdminError::MissingField("name"))?;
    let email = trimmed(Some(registration.email.as_str()))
        .ok_or(AdminError::MissingField("email"))?
        .to_lowercase();

    let tx = conn.unchecked_transaction()?;
    if get_reviewer_by_email(&tx, &email)?.is_some() {
        return Err(AdminError::EmailTaken(email));
    }
    let settings = get_or_create_settings(&tx)?;

    let reviewer = Reviewer {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email,
        license_number: trimmed(registration.license_number.as_deref()).map(String::from),
        role: ReviewerRole::Physician,
        status: ReviewerStatus::Pending,
        is_active: false,
        fee_per_review_cents: settings.default_fee_per_review_cents,
        created_at: now,
        approved_at: None,
        approved_by: None,
    };
    insert_reviewer(&tx, &reviewer)?;
    tx.commit()?;

    tracing::info!(reviewer_id = %reviewer.id, "Reviewer registered, awaiting approval");
    Ok(reviewer)
}

pub fn list_reviewers(conn: &Connection, actor_id: &Uuid) -> Result<Vec<ReviewerOverview>, AdminError> {
    require_admin(conn, actor_id)?;
    Ok(list_reviewer_overviews(conn)?)
}

/// Approve a registration. The fee is reset to the current default.
pub fn approve_reviewer(
    conn: &Connection,
    actor_id: &Uuid,
    reviewer_id: &Uuid,
    now: NaiveDateTime,
) -> Result<Reviewer, AdminError> {
    let tx = conn.unchecked_transaction()?;
    require_admin(&tx, actor_id)?;
    let target = load_reviewer(&tx, reviewer_id)?;
    let settings = get_or_create_settings(&tx)?;

    mark_reviewer_approved(&tx, reviewer_id, actor_id, settings.default_fee_per_review_cents, &now)?;
    insert_audit_entry(
        &tx,
        &AuditEntry::new(AuditAction::ApprovePhysician, EntityType::Physician, now)
            .entity(*reviewer_id)
            .by(*actor_id)
            .details(json!({ "approvedPhysician": target.email })),
    )?;
    let updated = load_reviewer(&tx, reviewer_id)?;
    tx.commit()?;

    tracing::info!(reviewer_id = %reviewer_id, actor_id = %actor_id, "Reviewer approved");
    Ok(updated)
}

pub fn deny_reviewer(
    conn: &Connection,
    actor_id: &Uuid,
    reviewer_id: &Uuid,
    reason: Option<&str>,
    now: NaiveDateTime,
) -> Result<Reviewer, AdminError> {
    let tx = conn.unchecked_transaction()?;
    require_admin(&tx, actor_id)?;
    let target = load_reviewer(&tx, reviewer_id)?;

    mark_reviewer_denied(&tx, reviewer_id)?;
    insert_audit_entry(
        &tx,
        &AuditEntry::new(AuditAction::DenyPhysician, EntityType::Physician, now)
            .entity(*reviewer_id)
            .by(*actor_id)
            .details(json!({ "deniedPhysician": target.email, "reason": trimmed(reason) })),
    )?;
    let updated = load_reviewer(&tx, reviewer_id)?;
    tx.commit()?;

    tracing::info!(reviewer_id = %reviewer_id, actor_id = %actor_id, "Reviewer denied");
    Ok(updated)
}

pub fn set_reviewer_active(
    conn: &Connection,
    actor_id: &Uuid,
    reviewer_id: &Uuid,
    active: bool,
    now: NaiveDateTime,
) -> Result<Reviewer, AdminError> {
    let tx = conn.unchecked_transaction()?;
    require_admin(&tx, actor_id)?;
    let target = load_reviewer(&tx, reviewer_id)?;

    set_reviewer_active_flag(&tx, reviewer_id, active)?;
    let action = if active {
        AuditAction::ActivatePhysician
    } else {
        AuditAction::DeactivatePhysician
    };
    insert_audit_entry(
        &tx,
        &AuditEntry::new(action, EntityType::Physician, now)
            .entity(*reviewer_id)
            .by(*actor_id)
            .details(json!({ "physicianEmail": target.email })),
    )?;
    let updated = load_reviewer(&tx, reviewer_id)?;
    tx.commit()?;

    tracing::info!(reviewer_id = %reviewer_id, active, "Reviewer activation changed");
    Ok(updated)
}

pub fn update_reviewer_fee(
    conn: &Connection,
    actor_id: &Uuid,
    reviewer_id: &Uuid,
    fee_cents: i64,
    now: NaiveDateTime,
) -> Result<Reviewer, AdminError> {
    let fee_cents = validate_fee(fee_cents)?;

    let tx = conn.unchecked_transaction()?;
    require_admin(&tx, actor_id)?;
    load_reviewer(&tx, reviewer_id)?;

    set_reviewer_fee(&tx, reviewer_id, fee_cents)?;
    insert_audit_entry(
        &tx,
        &AuditEntry::new(AuditAction::UpdateFee, EntityType::Physician, now)
            .entity(*reviewer_id)
            .by(*actor_id)
            .details(json!({ "newFeeCents": fee_cents })),
    )?;
    let updated = load_reviewer(&tx, reviewer_id)?;
    tx.commit()?;

    tracing::info!(reviewer_id = %reviewer_id, fee_cents, "Reviewer fee updated");
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub fn get_settings(conn: &Connection, actor_id: &Uuid) -> Result<SystemSettings, AdminError> {
    require_admin(conn, actor_id)?;
    Ok(get_or_create_settings(conn)?)
}

/// Apply a partial update. Affects future registrations, approvals and
/// cycles only; existing fees and cycles are unchanged.
pub fn update_settings(
    conn: &Connection,
    actor_id: &Uuid,
    patch: &SettingsPatch,
    now: NaiveDateTime,
) -> Result<SystemSettings, AdminError> {
    if let Some(fee) = patch.default_fee_per_review_cents {
        validate_fee(fee)?;
    }

    let tx = conn.unchecked_transaction()?;
    require_admin(&tx, actor_id)?;

    let mut settings = get_or_create_settings(&tx)?;
    if let Some(fee) = patch.default_fee_per_review_cents {
        settings.default_fee_per_review_cents = fee;
    }
    if let Some(cycle_type) = patch.payout_cycle_type {
        settings.payout_cycle_type = cycle_type;
    }
    settings.updated_at = Some(now);
    save_settings(&tx, &settings)?;

    insert_audit_entry(
        &tx,
        &AuditEntry::new(AuditAction::UpdateSettings, EntityType::System, now)
            .by(*actor_id)
            .details(serde_json::to_value(patch).map_err(DatabaseError::from)?),
    )?;
    tx.commit()?;

    tracing::info!(
        default_fee_cents = settings.default_fee_per_review_cents,
        payout_cycle = settings.payout_cycle_type.as_str(),
        "System settings updated"
    );
    Ok(settings)
}

// ---------------------------------------------------------------------------
// Payouts
// ---------------------------------------------------------------------------

/// All payout cycles: open first, then closed, then paid.
pub fn list_payout_cycles(conn: &Connection, actor_id: &Uuid) -> Result<Vec<CycleOverview>, AdminError> {
    require_admin(conn, actor_id)?;
    list_payout_cycles_with_counts(conn)?
        .into_iter()
        .map(|(cycle, payment_count)| -> Result<CycleOverview, AdminError> {
            let reviewer = get_reviewer(conn, &cycle.reviewer_id)?;
            Ok(CycleOverview {
                reviewer: reviewer.as_ref().map(ReviewerRef::from),
                cycle,
                payment_count,
            })
        })
        .collect()
}

/// Settle a cycle and every payment in it. A cycle is paid at most once.
pub fn mark_cycle_paid(
    conn: &Connection,
    actor_id: &Uuid,
    cycle_id: &Uuid,
    notes: Option<&str>,
    now: NaiveDateTime,
) -> Result<PayoutCycle, AdminError> {
    let tx = conn.unchecked_transaction()?;
    require_admin(&tx, actor_id)?;
    let current = get_payout_cycle(&tx, cycle_id)?.ok_or(AdminError::CycleNotFound(*cycle_id))?;
    if current.status == CycleStatus::Paid {
        tracing::warn!(cycle_id = %cycle_id, "Payout cycle already paid");
        return Err(AdminError::CycleAlreadyPaid(*cycle_id));
    }

    let settled = settle_payout_cycle(&tx, cycle_id, actor_id, trimmed(notes), &now)?;
    let cycle = get_payout_cycle(&tx, cycle_id)?.ok_or(AdminError::CycleNotFound(*cycle_id))?;
    insert_audit_entry(
        &tx,
        &AuditEntry::new(AuditAction::MarkCyclePaid, EntityType::PayoutCycle, now)
            .entity(*cycle_id)
            .by(*actor_id)
            .details(json!({
                "totalAmountCents": cycle.total_amount_cents,
                "totalReviews": cycle.total_reviews,
                "physicianId": cycle.reviewer_id,
            })),
    )?;
    tx.commit()?;

    tracing::info!(
        cycle_id = %cycle_id,
        payments = settled,
        total_cents = cycle.total_amount_cents,
        "Payout cycle marked paid"
    );
    Ok(cycle)
}

// ---------------------------------------------------------------------------
// Fulfillment
// ---------------------------------------------------------------------------

/// Record shipment of an approved assessment's order.
pub fn mark_shipped(
    conn: &Connection,
    actor_id: &Uuid,
    assessment_id: &Uuid,
    tracking_number: Option<&str>,
    now: NaiveDateTime,
) -> Result<Assessment, AdminError> {
    let tx = conn.unchecked_transaction()?;
    require_admin(&tx, actor_id)?;
    let assessment =
        get_assessment(&tx, assessment_id)?.ok_or(AdminError::AssessmentNotFound(*assessment_id))?;
    if assessment.status != AssessmentStatus::Approved {
        tracing::warn!(
            assessment_id = %assessment_id,
            status = assessment.status.as_str(),
            "Shipment of unapproved assessment rejected"
        );
        return Err(AdminError::NotShippable(assessment.status));
    }

    let tracking_number = trimmed(tracking_number);
    record_assessment_shipment(&tx, assessment_id, tracking_number, &now)?;
    insert_audit_entry(
        &tx,
        &AuditEntry::new(AuditAction::Ship, EntityType::Assessment, now)
            .entity(*assessment_id)
            .by(*actor_id)
            .details(json!({ "trackingNumber": tracking_number })),
    )?;
    let shipped =
        get_assessment(&tx, assessment_id)?.ok_or(AdminError::AssessmentNotFound(*assessment_id))?;
    tx.commit()?;

    tracing::info!(assessment_id = %assessment_id, "Order marked shipped");
    Ok(shipped)
}
