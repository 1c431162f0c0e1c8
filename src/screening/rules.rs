//! The screening rule table.
//!
//! Each rule inspects the questionnaire and yields at most one flag.
//! Rules are independent of each other; the table order is the order
//! flags appear in the result and is part of the output contract.

use super::messages::MessageTemplates;
use super::questionnaire::{QuestionnaireAnswers, ReportedItem};
use super::types::{FlagCode, RiskFlag};

pub const HIGH_SYSTOLIC_THRESHOLD: i64 = 150;
pub const HIGH_DIASTOLIC_THRESHOLD: i64 = 95;
pub const LOW_SYSTOLIC_THRESHOLD: i64 = 90;
pub const LOW_DIASTOLIC_THRESHOLD: i64 = 60;

pub type RuleCheck = fn(&QuestionnaireAnswers) -> Option<RiskFlag>;

/// A single screening rule.
#[derive(Clone, Copy)]
pub struct Rule {
    pub code: FlagCode,
    pub check: RuleCheck,
}

impl Rule {
    pub fn apply(&self, answers: &QuestionnaireAnswers) -> Option<RiskFlag> {
        (self.check)(answers)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("code", &self.code).finish()
    }
}

pub const RULES: &[Rule] = &[
    // Disqualifying
    Rule { code: FlagCode::NitrateUse, check: nitrate_use },
    Rule { code: FlagCode::MedicalRestriction, check: medical_restriction },
    Rule { code: FlagCode::SevereCardiac, check: severe_cardiac },
    Rule { code: FlagCode::Pregnancy, check: pregnancy },
    // Caution
    Rule { code: FlagCode::HighBp, check: high_bp },
    Rule { code: FlagCode::LowBp, check: low_bp },
    Rule { code: FlagCode::HeartAttackHistory, check: heart_attack_history },
    Rule { code: FlagCode::StrokeHistory, check: stroke_history },
    Rule { code: FlagCode::NaionRisk, check: naion_risk },
    Rule { code: FlagCode::SsriUse, check: ssri_use },
    Rule { code: FlagCode::PriapismHistory, check: priapism_history },
    Rule { code: FlagCode::KidneyImpairment, check: kidney_impairment },
    Rule { code: FlagCode::LiverImpairment, check: liver_impairment },
    Rule { code: FlagCode::HeartCondition, check: heart_condition },
    Rule { code: FlagCode::BpMedication, check: bp_medication },
    Rule { code: FlagCode::Breastfeeding, check: breastfeeding },
    Rule { code: FlagCode::OxytocinAllergy, check: oxytocin_allergy },
    Rule { code: FlagCode::UterineConditions, check: uterine_conditions },
    // Informational
    Rule { code: FlagCode::Diabetes, check: diabetes },
    Rule { code: FlagCode::Ttc, check: trying_to_conceive },
];

fn indicator_flag(reported: bool, code: FlagCode) -> Option<RiskFlag> {
    reported.then(|| RiskFlag::new(code, MessageTemplates::standard(code)))
}

fn reported_item_flag(item: &ReportedItem, code: FlagCode) -> Option<RiskFlag> {
    if !item.is_present() {
        return None;
    }
    let flag = RiskFlag::new(code, MessageTemplates::standard(code));
    match item.detail().or(MessageTemplates::unspecified_detail(code)) {
        Some(detail) => Some(flag.with_details(detail)),
        None => Some(flag),
    }
}

fn nitrate_use(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    reported_item_flag(&a.takes_nitrates, FlagCode::NitrateUse)
}

fn medical_restriction(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.doctor_advised_no_sex, FlagCode::MedicalRestriction)
}

fn severe_cardiac(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.severe_cardiac_condition, FlagCode::SevereCardiac)
}

fn pregnancy(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.is_pregnant, FlagCode::Pregnancy)
}

fn high_bp(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    let elevated = a.systolic.above(HIGH_SYSTOLIC_THRESHOLD)
        || a.diastolic.above(HIGH_DIASTOLIC_THRESHOLD);
    elevated.then(|| {
        RiskFlag::new(FlagCode::HighBp, MessageTemplates::high_bp(a.systolic, a.diastolic))
            .with_details(MessageTemplates::high_bp_threshold(
                HIGH_SYSTOLIC_THRESHOLD,
                HIGH_DIASTOLIC_THRESHOLD,
            ))
    })
}

fn low_bp(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    let low = a.systolic.below(LOW_SYSTOLIC_THRESHOLD) || a.diastolic.below(LOW_DIASTOLIC_THRESHOLD);
    low.then(|| {
        RiskFlag::new(FlagCode::LowBp, MessageTemplates::low_bp(a.systolic, a.diastolic))
            .with_details(MessageTemplates::low_bp_threshold(
                LOW_SYSTOLIC_THRESHOLD,
                LOW_DIASTOLIC_THRESHOLD,
            ))
    })
}

fn heart_attack_history(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.has_heart_attack, FlagCode::HeartAttackHistory)
}

fn stroke_history(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.has_stroke, FlagCode::StrokeHistory)
}

fn naion_risk(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.has_eye_disorder, FlagCode::NaionRisk)
}

fn ssri_use(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    reported_item_flag(&a.takes_ssris, FlagCode::SsriUse)
}

fn priapism_history(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.has_priapism, FlagCode::PriapismHistory)
}

fn kidney_impairment(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.has_kidney_disease, FlagCode::KidneyImpairment)
}

fn liver_impairment(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.has_liver_disease, FlagCode::LiverImpairment)
}

fn heart_condition(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.has_heart_condition, FlagCode::HeartCondition)
}

fn bp_medication(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    reported_item_flag(&a.takes_blood_pressure_meds, FlagCode::BpMedication)
}

fn breastfeeding(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.is_breastfeeding, FlagCode::Breastfeeding)
}

fn oxytocin_allergy(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.oxytocin_allergy, FlagCode::OxytocinAllergy)
}

fn uterine_conditions(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.uterine_conditions, FlagCode::UterineConditions)
}

fn diabetes(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.has_diabetes, FlagCode::Diabetes)
}

fn trying_to_conceive(a: &QuestionnaireAnswers) -> Option<RiskFlag> {
    indicator_flag(a.trying_to_conceive, FlagCode::Ttc)
}
