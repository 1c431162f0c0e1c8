use super::questionnaire::QuestionnaireAnswers;
use super::rules::RULES;
use super::types::{FlagType, RiskAnalysisResult, RiskFlag, RiskSummary};

/// Submissions without any escalating flag still go to a reviewer:
/// there is no automatic approval path.
const REVIEW_UNFLAGGED_SUBMISSIONS: bool = true;

/// Screen one questionnaire.
///
/// Runs every rule in table order and aggregates the verdicts. Total and
/// deterministic: the same answers always produce the same result.
pub fn evaluate(answers: &QuestionnaireAnswers) -> RiskAnalysisResult {
    let flags: Vec<RiskFlag> = RULES.iter().filter_map(|rule| rule.apply(answers)).collect();
    aggregate(flags)
}

/// Derive the verdicts and summary from an ordered flag list.
pub fn aggregate(flags: Vec<RiskFlag>) -> RiskAnalysisResult {
    let is_auto_disqualified = flags
        .iter()
        .any(|f| f.flag_type == FlagType::Disqualifier);
    let escalated = flags.iter().any(|f| f.flag_type.escalates());
    let requires_review = escalated || REVIEW_UNFLAGGED_SUBMISSIONS;
    let summary = RiskSummary::from_flags(&flags);

    RiskAnalysisResult {
        flags,
        is_auto_disqualified,
        requires_review,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::questionnaire::{BloodPressure, ReportedItem};
    use crate::screening::types::{FlagCode, FlagSeverity};
    use serde_json::json;

    fn from_json(value: serde_json::Value) -> RiskAnalysisResult {
        evaluate(&QuestionnaireAnswers::from_form(&value))
    }

    fn assert_consistent(result: &RiskAnalysisResult) {
        assert_eq!(result.summary, RiskSummary::from_flags(&result.flags));
        assert_eq!(result.summary.total_flags, result.flags.len());
        for flag in &result.flags {
            assert_eq!(flag.severity, flag.flag_type.severity());
        }
        assert_eq!(
            result.is_auto_disqualified,
            result.flags.iter().any(|f| f.flag_type == FlagType::Disqualifier)
        );
        assert!(result.requires_review);
    }

    fn everything_reported() -> QuestionnaireAnswers {
        QuestionnaireAnswers {
            takes_nitrates: ReportedItem::yes_with("nitroglycerin"),
            doctor_advised_no_sex: true,
            severe_cardiac_condition: true,
            is_pregnant: true,
            systolic: BloodPressure::reading(200),
            diastolic: BloodPressure::reading(50),
            has_heart_attack: true,
            has_stroke: true,
            has_eye_disorder: true,
            takes_ssris: ReportedItem::yes(),
            has_priapism: true,
            has_kidney_disease: true,
            has_liver_disease: true,
            has_heart_condition: true,
            takes_blood_pressure_meds: ReportedItem::yes_with("amlodipine"),
            is_breastfeeding: true,
            oxytocin_allergy: true,
            uterine_conditions: true,
            has_diabetes: true,
            trying_to_conceive: true,
        }
    }

    #[test]
    fn empty_questionnaire_has_no_flags_but_requires_review() {
        let result = evaluate(&QuestionnaireAnswers::default());
        assert!(result.flags.is_empty());
        assert!(!result.is_auto_disqualified);
        assert!(result.requires_review);
        assert_eq!(result.summary, RiskSummary::default());
    }

    #[test]
    fn nitrate_scenario() {
        let result = from_json(json!({
            "takesNitrates": true,
            "nitrateDetails": "nitroglycerin"
        }));
        assert!(result.is_auto_disqualified);
        assert!(result.requires_review);
        assert_eq!(result.flags.len(), 1);
        let flag = &result.flags[0];
        assert_eq!(flag.code, FlagCode::NitrateUse);
        assert_eq!(flag.flag_type, FlagType::Disqualifier);
        assert_eq!(flag.severity, FlagSeverity::Critical);
        assert_eq!(flag.details.as_deref(), Some("nitroglycerin"));
        assert_eq!(
            result.summary,
            RiskSummary {
                total_flags: 1,
                disqualifiers: 1,
                cautions: 0,
                info: 0,
            }
        );
    }

    #[test]
    fn pregnancy_and_diabetes_scenario() {
        let result = from_json(json!({ "isPregnant": true, "hasDiabetes": true }));
        assert_eq!(result.codes(), vec![FlagCode::Pregnancy, FlagCode::Diabetes]);
        assert_eq!(result.flags[0].flag_type, FlagType::Disqualifier);
        assert_eq!(result.flags[1].flag_type, FlagType::Info);
        assert!(result.is_auto_disqualified);
        assert!(result.requires_review);
        assert_consistent(&result);
    }

    #[test]
    fn unparsable_systolic_scenario() {
        let result = from_json(json!({ "currentBPSystolic": "abc" }));
        assert!(result.flags.is_empty());
        assert!(result.requires_review);
        assert!(!result.is_auto_disqualified);
    }

    #[test]
    fn free_text_indicators_count_as_reported() {
        let result = from_json(json!({ "takesNitrates": "Nitroglycerin daily" }));
        assert_eq!(result.codes(), vec![FlagCode::NitrateUse]);
        assert!(result.is_auto_disqualified);
        assert_eq!(result.flags[0].details.as_deref(), Some("Nitrates specified"));

        let result = from_json(json!({ "isPregnant": "pregnant", "takesSSRIs": ["sertraline"] }));
        assert_eq!(result.codes(), vec![FlagCode::Pregnancy, FlagCode::SsriUse]);
        assert!(result.is_auto_disqualified);
        assert_consistent(&result);
    }

    #[test]
    fn negative_checkbox_strings_raise_nothing() {
        let result = from_json(json!({
            "takesNitrates": "false",
            "isPregnant": "no",
            "doctorAdvisedNoSex": "off",
            "severeCardiacCondition": "0",
            "hasDiabetes": ""
        }));
        assert!(result.flags.is_empty());
        assert!(!result.is_auto_disqualified);
    }

    #[test]
    fn exponent_readings_keep_leading_digit() {
        let result = from_json(json!({ "currentBPSystolic": 1e21, "currentBPDiastolic": 80 }));
        assert_eq!(result.codes(), vec![FlagCode::LowBp]);
        assert!(result.flags[0].message.contains("1/80"));
    }

    #[test]
    fn high_and_low_bp_are_independent() {
        let result = from_json(json!({
            "currentBPSystolic": "200",
            "currentBPDiastolic": "50"
        }));
        assert_eq!(result.codes(), vec![FlagCode::HighBp, FlagCode::LowBp]);
        assert_eq!(result.flags[0].message, "Blood pressure elevated: 200/50");
        assert_eq!(result.flags[1].message, "Blood pressure low: 200/50");
        assert!(!result.is_auto_disqualified);
        assert_consistent(&result);
    }

    #[test]
    fn bp_boundary_is_strict() {
        let at_limit = from_json(json!({
            "currentBPSystolic": "150",
            "currentBPDiastolic": "95"
        }));
        assert!(!at_limit.has_code(FlagCode::HighBp));

        let over = from_json(json!({
            "currentBPSystolic": "151",
            "currentBPDiastolic": "95"
        }));
        assert!(over.has_code(FlagCode::HighBp));
    }

    #[test]
    fn info_only_submission_still_requires_review() {
        let result = from_json(json!({ "tryingToConceive": true }));
        assert_eq!(result.codes(), vec![FlagCode::Ttc]);
        assert!(!result.is_auto_disqualified);
        assert!(result.requires_review);
    }

    #[test]
    fn disqualified_submission_keeps_caution_flags() {
        let result = from_json(json!({
            "severeCardiacCondition": true,
            "hasHeartAttack": true,
            "takesSSRIs": true
        }));
        assert_eq!(
            result.codes(),
            vec![
                FlagCode::SevereCardiac,
                FlagCode::HeartAttackHistory,
                FlagCode::SsriUse
            ]
        );
        assert_eq!(result.flags[2].details.as_deref(), Some("SSRIs specified"));
        assert_eq!(result.summary.disqualifiers, 1);
        assert_eq!(result.summary.cautions, 2);
        assert_consistent(&result);
    }

    #[test]
    fn every_flag_in_evaluation_order() {
        let result = evaluate(&everything_reported());
        let expected: Vec<FlagCode> = RULES.iter().map(|r| r.code).collect();
        assert_eq!(result.codes(), expected);
        assert_eq!(
            result.summary,
            RiskSummary {
                total_flags: 20,
                disqualifiers: 4,
                cautions: 14,
                info: 2,
            }
        );
        assert_consistent(&result);
    }

    #[test]
    fn each_disqualifying_field_disqualifies_alone() {
        for field in [
            "takesNitrates",
            "doctorAdvisedNoSex",
            "severeCardiacCondition",
            "isPregnant",
        ] {
            let result = from_json(json!({ field: true }));
            assert!(result.is_auto_disqualified, "{field} should disqualify");
            assert_eq!(result.summary.disqualifiers, 1);
            assert_consistent(&result);
        }
    }

    #[test]
    fn caution_fields_never_disqualify() {
        for field in [
            "hasHeartAttack",
            "hasStroke",
            "hasEyeDisorder",
            "takesSSRIs",
            "hasPriapism",
            "hasKidneyDisease",
            "hasLiverDisease",
            "hasHeartCondition",
            "takesBloodPressureMeds",
            "isBreastfeeding",
            "oxytocinAllergy",
            "uterineConditions",
        ] {
            let result = from_json(json!({ field: true }));
            assert!(!result.is_auto_disqualified, "{field} must not disqualify");
            assert_eq!(result.summary.cautions, 1, "{field} should raise one caution");
            assert_consistent(&result);
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let answers = everything_reported();
        let first = evaluate(&answers);
        let second = evaluate(&answers);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn result_round_trips_through_stored_json() {
        let result = evaluate(&everything_reported());
        let stored = serde_json::to_string(&result.flags).unwrap();
        let restored: Vec<RiskFlag> = serde_json::from_str(&stored).unwrap();
        assert_eq!(aggregate(restored), result);
    }
}
