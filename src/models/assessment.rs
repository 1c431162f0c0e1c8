use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::enums::AssessmentStatus;
use crate::screening::RiskFlag;

/// A submitted intake questionnaire and its review lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub sections: AssessmentSections,
    pub consent: ConsentRecord,
    pub risk_flags: Vec<RiskFlag>,
    pub is_auto_disqualified: bool,
    pub requires_review: bool,
    pub status: AssessmentStatus,
    pub reviewer_id: Option<Uuid>,
    pub reviewer_notes: Option<String>,
    pub denial_reason: Option<String>,
    pub decided_at: Option<NaiveDateTime>,
    pub shipped_at: Option<NaiveDateTime>,
    pub tracking_number: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// The questionnaire split into the sections shown to reviewers.
/// Each section is a JSON object holding only the keys the patient sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSections {
    pub patient_info: Value,
    pub medical_history: Value,
    pub medications: Value,
    pub sexual_health: Value,
    pub contraindications: Value,
    pub pt141: Value,
    pub oxytocin: Value,
}

impl AssessmentSections {
    /// "First Last" from the patient info section; blank parts are skipped.
    pub fn patient_name(&self) -> String {
        ["firstName", "lastName"]
            .iter()
            .filter_map(|key| self.patient_info.get(key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn patient_email(&self) -> Option<&str> {
        self.patient_info.get("email").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub signed: bool,
    pub signature_data: Option<String>,
    pub signed_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patient_name_joins_present_parts() {
        let sections = AssessmentSections {
            patient_info: json!({ "firstName": "Ana ", "lastName": "Lima", "email": "ana@example.com" }),
            ..Default::default()
        };
        assert_eq!(sections.patient_name(), "Ana Lima");
        assert_eq!(sections.patient_email(), Some("ana@example.com"));
    }

    #[test]
    fn patient_name_tolerates_missing_fields() {
        let sections = AssessmentSections {
            patient_info: json!({ "lastName": "Lima" }),
            ..Default::default()
        };
        assert_eq!(sections.patient_name(), "Lima");
        assert_eq!(sections.patient_email(), None);
        assert_eq!(AssessmentSections::default().patient_name(), "");
    }
}
