use super::questionnaire::BloodPressure;
use super::types::FlagCode;

/// Reviewer-facing wording for every flag. Clinical, terse, and stable:
/// persisted messages are shown verbatim in the decision view.
pub struct MessageTemplates;

impl MessageTemplates {
    /// Fixed message for flags that carry no interpolated values.
    pub fn standard(code: FlagCode) -> &'static str {
        match code {
            FlagCode::NitrateUse => "Patient uses nitrate medications",
            FlagCode::MedicalRestriction => "Doctor has advised against sexual activity",
            FlagCode::SevereCardiac => "Patient has severe/unstable cardiac condition",
            FlagCode::Pregnancy => "Patient is pregnant - disqualified for PT-141 and Oxytocin",
            FlagCode::HighBp => "Blood pressure elevated",
            FlagCode::LowBp => "Blood pressure low",
            FlagCode::HeartAttackHistory => "History of heart attack",
            FlagCode::StrokeHistory => "History of stroke or TIA",
            FlagCode::NaionRisk => "History of eye disorder (potential NAION risk)",
            FlagCode::SsriUse => "Uses SSRIs or psychiatric medications",
            FlagCode::PriapismHistory => "History of priapism",
            FlagCode::KidneyImpairment => "Kidney disease or impairment",
            FlagCode::LiverImpairment => "Liver disease or impairment",
            FlagCode::HeartCondition => "History of heart disease or condition",
            FlagCode::BpMedication => "Takes blood pressure medication",
            FlagCode::Breastfeeding => "Patient is breastfeeding",
            FlagCode::OxytocinAllergy => "Known allergy to oxytocin",
            FlagCode::UterineConditions => "Has uterine conditions or prior uterine surgery",
            FlagCode::Diabetes => "Patient has diabetes",
            FlagCode::Ttc => "Patient is trying to conceive",
        }
    }

    /// Placeholder detail when the patient ticked a medication box but left
    /// the name blank.
    pub fn unspecified_detail(code: FlagCode) -> Option<&'static str> {
        match code {
            FlagCode::NitrateUse => Some("Nitrates specified"),
            FlagCode::SsriUse => Some("SSRIs specified"),
            FlagCode::BpMedication => Some("BP meds specified"),
            _ => None,
        }
    }

    /// HIGH_BP message. Missing components render as `NaN`.
    pub fn high_bp(systolic: BloodPressure, diastolic: BloodPressure) -> String {
        format!(
            "{}: {}/{}",
            Self::standard(FlagCode::HighBp),
            systolic,
            diastolic
        )
    }

    /// LOW_BP message.
    pub fn low_bp(systolic: BloodPressure, diastolic: BloodPressure) -> String {
        format!(
            "{}: {}/{}",
            Self::standard(FlagCode::LowBp),
            systolic,
            diastolic
        )
    }

    pub fn high_bp_threshold(systolic: i64, diastolic: i64) -> String {
        format!("BP above {systolic}/{diastolic} threshold")
    }

    pub fn low_bp_threshold(systolic: i64, diastolic: i64) -> String {
        format!("BP below {systolic}/{diastolic} threshold")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bp_messages_interpolate_readings() {
        let msg = MessageTemplates::high_bp(BloodPressure::reading(160), BloodPressure::reading(90));
        assert_eq!(msg, "Blood pressure elevated: 160/90");

        let msg = MessageTemplates::low_bp(BloodPressure::reading(85), BloodPressure::missing());
        assert_eq!(msg, "Blood pressure low: 85/NaN");
    }

    #[test]
    fn only_medication_flags_have_placeholder_detail() {
        assert!(MessageTemplates::unspecified_detail(FlagCode::NitrateUse).is_some());
        assert!(MessageTemplates::unspecified_detail(FlagCode::SsriUse).is_some());
        assert!(MessageTemplates::unspecified_detail(FlagCode::BpMedication).is_some());
        assert!(MessageTemplates::unspecified_detail(FlagCode::Pregnancy).is_none());
    }
}
