//! Questionnaire intake.
//!
//! Screens a submitted form, splits it into the sections reviewers read,
//! and stores it as a pending assessment.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{insert_assessment, insert_audit_entry, DatabaseError};
use crate::models::enums::{AssessmentStatus, AuditAction, EntityType};
use crate::models::{Assessment, AssessmentSections, AuditEntry, ConsentRecord};
use crate::screening::{self, QuestionnaireAnswers, RiskAnalysisResult};

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Invalid form: {0}")]
    InvalidForm(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a submission came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl SubmissionContext {
    /// Client address from an `X-Forwarded-For` chain, else the socket peer.
    pub fn from_request(
        forwarded_for: Option<&str>,
        remote_addr: Option<&str>,
        user_agent: Option<&str>,
    ) -> Self {
        let forwarded = forwarded_for
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        Self {
            ip_address: forwarded.or(remote_addr).map(String::from),
            user_agent: user_agent.map(String::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub assessment_id: Uuid,
    pub analysis: RiskAnalysisResult,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

pub const PATIENT_INFO_FIELDS: &[&str] = &[
    "firstName", "lastName", "email", "phone", "dateOfBirth", "gender", "address", "city", "state",
    "zipCode",
];

pub const MEDICAL_HISTORY_FIELDS: &[&str] = &[
    "hasHeartCondition", "hasHighBloodPressure", "hasLowBloodPressure", "hasStroke",
    "hasHeartAttack", "hasDiabetes", "hasKidneyDisease", "hasLiverDisease", "hasEyeDisorder",
    "hasPriapism", "otherConditions", "surgeries", "allergies",
];

pub const MEDICATION_FIELDS: &[&str] = &[
    "takesNitrates", "nitrateDetails", "takesBloodPressureMeds", "bloodPressureMedDetails",
    "takesSSRIs", "ssriDetails", "otherMedDetails",
];

pub const SEXUAL_HEALTH_FIELDS: &[&str] = &[
    "experiencesED", "edFrequency", "edDuration", "lowDesire", "desireFrequency",
    "relationshipStatus", "partnerAware", "previousTreatments",
];

pub const CONTRAINDICATION_FIELDS: &[&str] = &[
    "doctorAdvisedNoSex", "severeCardiacCondition", "currentBPSystolic", "currentBPDiastolic",
    "isPregnant", "isBreastfeeding", "tryingToConceive",
];

pub const PT141_FIELDS: &[&str] = &["nausea", "flushing", "headaches", "pt141Conditions"];

pub const OXYTOCIN_FIELDS: &[&str] = &["oxytocinAllergy", "uterineConditions", "oxytocinConditions"];

fn pick(form: &Map<String, Value>, keys: &[&str]) -> Value {
    Value::Object(
        keys.iter()
            .filter_map(|&key| form.get(key).map(|v| (key.to_string(), v.clone())))
            .collect(),
    )
}

/// Split a raw form into reviewer sections. Keys the patient did not send
/// are left out; unknown keys are dropped.
pub fn split_sections(form: &Map<String, Value>) -> AssessmentSections {
    AssessmentSections {
        patient_info: pick(form, PATIENT_INFO_FIELDS),
        medical_history: pick(form, MEDICAL_HISTORY_FIELDS),
        medications: pick(form, MEDICATION_FIELDS),
        sexual_health: pick(form, SEXUAL_HEALTH_FIELDS),
        contraindications: pick(form, CONTRAINDICATION_FIELDS),
        pt141: pick(form, PT141_FIELDS),
        oxytocin: pick(form, OXYTOCIN_FIELDS),
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Screen and store one questionnaire as a pending assessment.
pub fn submit_assessment(
    conn: &rusqlite::Connection,
    form: &Value,
    ctx: &SubmissionContext,
    now: NaiveDateTime,
) -> Result<SubmissionReceipt, IntakeError> {
    let fields = form
        .as_object()
        .ok_or_else(|| IntakeError::InvalidForm("expected a JSON object".into()))?;

    let analysis = screening::evaluate(&QuestionnaireAnswers::from_form(form));

    let assessment = Assessment {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        sections: split_sections(fields),
        consent: ConsentRecord {
            signed: true,
            signature_data: fields
                .get("signature")
                .and_then(Value::as_str)
                .map(String::from),
            signed_at: now,
        },
        risk_flags: analysis.flags.clone(),
        is_auto_disqualified: analysis.is_auto_disqualified,
        requires_review: analysis.requires_review,
        status: AssessmentStatus::Pending,
        reviewer_id: None,
        reviewer_notes: None,
        denial_reason: None,
        decided_at: None,
        shipped_at: None,
        tracking_number: None,
        ip_address: ctx.ip_address.clone(),
        user_agent: ctx.user_agent.clone(),
    };

    let mut entry = AuditEntry::new(AuditAction::Submit, EntityType::Assessment, now)
        .entity(assessment.id)
        .details(json!({
            "flags": analysis.summary,
            "isAutoDisqualified": analysis.is_auto_disqualified,
        }));
    entry.ip_address = ctx.ip_address.clone();

    let tx = conn.unchecked_transaction()?;
    insert_assessment(&tx, &assessment)?;
    insert_audit_entry(&tx, &entry)?;
    tx.commit()?;

    tracing::info!(
        assessment_id = %assessment.id,
        total_flags = analysis.summary.total_flags,
        disqualifiers = analysis.summary.disqualifiers,
        cautions = analysis.summary.cautions,
        auto_disqualified = analysis.is_auto_disqualified,
        requires_review = analysis.requires_review,
        "Assessment submitted"
    );

    Ok(SubmissionReceipt {
        assessment_id: assessment.id,
        analysis,
    })
}
