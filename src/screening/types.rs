use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FlagType / FlagSeverity
// ---------------------------------------------------------------------------

/// Tier a flag belongs to. The tier alone decides the severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    /// Absolute contraindication: the submission cannot proceed to treatment.
    Disqualifier,
    /// Needs a licensed reviewer's clinical judgment before approval.
    Caution,
    /// Context only, never blocks or escalates on its own.
    Info,
}

impl FlagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disqualifier => "disqualifier",
            Self::Caution => "caution",
            Self::Info => "info",
        }
    }

    pub fn severity(&self) -> FlagSeverity {
        match self {
            Self::Disqualifier => FlagSeverity::Critical,
            Self::Caution => FlagSeverity::Warning,
            Self::Info => FlagSeverity::Info,
        }
    }

    /// Whether a flag of this tier forces reviewer attention.
    pub fn escalates(&self) -> bool {
        !matches!(self, Self::Info)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FlagSeverity {
    Critical,
    Warning,
    Info,
}

impl FlagSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

// ---------------------------------------------------------------------------
// FlagCode
// ---------------------------------------------------------------------------

/// Stable short identifier of a flag. Persisted and read back by reviewer
/// tooling, so the serialized spelling must never change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagCode {
    NitrateUse,
    MedicalRestriction,
    SevereCardiac,
    Pregnancy,
    HighBp,
    LowBp,
    HeartAttackHistory,
    StrokeHistory,
    NaionRisk,
    SsriUse,
    PriapismHistory,
    KidneyImpairment,
    LiverImpairment,
    HeartCondition,
    BpMedication,
    Breastfeeding,
    OxytocinAllergy,
    UterineConditions,
    Diabetes,
    Ttc,
}

impl FlagCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NitrateUse => "NITRATE_USE",
            Self::MedicalRestriction => "MEDICAL_RESTRICTION",
            Self::SevereCardiac => "SEVERE_CARDIAC",
            Self::Pregnancy => "PREGNANCY",
            Self::HighBp => "HIGH_BP",
            Self::LowBp => "LOW_BP",
            Self::HeartAttackHistory => "HEART_ATTACK_HISTORY",
            Self::StrokeHistory => "STROKE_HISTORY",
            Self::NaionRisk => "NAION_RISK",
            Self::SsriUse => "SSRI_USE",
            Self::PriapismHistory => "PRIAPISM_HISTORY",
            Self::KidneyImpairment => "KIDNEY_IMPAIRMENT",
            Self::LiverImpairment => "LIVER_IMPAIRMENT",
            Self::HeartCondition => "HEART_CONDITION",
            Self::BpMedication => "BP_MEDICATION",
            Self::Breastfeeding => "BREASTFEEDING",
            Self::OxytocinAllergy => "OXYTOCIN_ALLERGY",
            Self::UterineConditions => "UTERINE_CONDITIONS",
            Self::Diabetes => "DIABETES",
            Self::Ttc => "TTC",
        }
    }

    /// The tier every flag with this code is raised in.
    pub fn tier(&self) -> FlagType {
        match self {
            Self::NitrateUse | Self::MedicalRestriction | Self::SevereCardiac | Self::Pregnancy => {
                FlagType::Disqualifier
            }
            Self::Diabetes | Self::Ttc => FlagType::Info,
            _ => FlagType::Caution,
        }
    }
}

// ---------------------------------------------------------------------------
// RiskFlag
// ---------------------------------------------------------------------------

/// A single safety observation raised against a questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskFlag {
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    pub code: FlagCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub severity: FlagSeverity,
}

impl RiskFlag {
    /// Tier and severity are derived from the code, so they can never disagree.
    pub fn new(code: FlagCode, message: impl Into<String>) -> Self {
        let flag_type = code.tier();
        Self {
            flag_type,
            code,
            message: message.into(),
            details: None,
            severity: flag_type.severity(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

// ---------------------------------------------------------------------------
// RiskAnalysisResult & RiskSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummary {
    pub total_flags: usize,
    pub disqualifiers: usize,
    pub cautions: usize,
    pub info: usize,
}

impl RiskSummary {
    pub fn from_flags(flags: &[RiskFlag]) -> Self {
        let count = |tier: FlagType| flags.iter().filter(|f| f.flag_type == tier).count();
        Self {
            total_flags: flags.len(),
            disqualifiers: count(FlagType::Disqualifier),
            cautions: count(FlagType::Caution),
            info: count(FlagType::Info),
        }
    }
}

/// Outcome of screening one questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysisResult {
    /// Flags in rule evaluation order, not sorted.
    pub flags: Vec<RiskFlag>,
    pub is_auto_disqualified: bool,
    pub requires_review: bool,
    pub summary: RiskSummary,
}

impl RiskAnalysisResult {
    #[cfg(test)]
    pub(crate) fn has_code(&self, code: FlagCode) -> bool {
        self.flags.iter().any(|f| f.code == code)
    }

    pub fn codes(&self) -> Vec<FlagCode> {
        self.flags.iter().map(|f| f.code).collect()
    }
}
