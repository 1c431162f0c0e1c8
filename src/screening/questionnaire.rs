//! Patient questionnaire as seen by the screening rules.
//!
//! Raw intake forms are loosely typed: indicators arrive as booleans,
//! checkbox strings, free text or numbers, blood pressure as free text.
//! Conversion into [`QuestionnaireAnswers`] never fails. Any answer with
//! content counts as reported; only absent, empty and explicitly negative
//! answers read as "not reported".

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// ReportedItem
// ---------------------------------------------------------------------------

/// A yes/no answer with optional free-text detail (e.g. medication name).
/// Detail text only survives when the answer is yes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedItem {
    present: bool,
    detail: Option<String>,
}

impl ReportedItem {
    pub fn new(present: bool, detail: Option<String>) -> Self {
        Self {
            present,
            detail: if present { detail } else { None },
        }
    }

    pub fn yes() -> Self {
        Self::new(true, None)
    }

    pub fn yes_with(detail: impl Into<String>) -> Self {
        Self::new(true, Some(detail.into()))
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

// ---------------------------------------------------------------------------
// BloodPressure
// ---------------------------------------------------------------------------

/// One blood-pressure component (systolic or diastolic).
///
/// `None` is the not-a-number case: a missing or unparsable reading.
/// Every threshold comparison against it is false, so it passes the
/// vitals screen silently. Rendered as `NaN` in flag messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodPressure(Option<i64>);

impl BloodPressure {
    pub fn missing() -> Self {
        Self(None)
    }

    pub fn reading(value: i64) -> Self {
        Self(Some(value))
    }

    pub fn value(&self) -> Option<i64> {
        self.0
    }

    pub fn is_missing(&self) -> bool {
        self.0.is_none()
    }

    /// Strictly above the threshold. False for a missing reading.
    pub fn above(&self, threshold: i64) -> bool {
        matches!(self.0, Some(v) if v > threshold)
    }

    /// Strictly below the threshold. False for a missing reading.
    pub fn below(&self, threshold: i64) -> bool {
        matches!(self.0, Some(v) if v < threshold)
    }

    /// Integer-prefix parse: leading whitespace, optional sign, optional
    /// `0x` prefix, then as many digits as present. `"120abc"` is 120,
    /// `"abc"` and `""` are missing.
    pub fn parse(raw: &str) -> Self {
        Self(parse_integer_prefix(raw))
    }

    /// Numbers are read through their shortest decimal text, so values
    /// printed in exponent form keep only their leading digit
    /// (`1e21` is 1, `5e-7` is 5).
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self(Some(i))
                } else if n.is_u64() {
                    Self(Some(i64::MAX))
                } else {
                    Self(n.as_f64().and_then(float_prefix))
                }
            }
            _ => Self(None),
        }
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("NaN"),
        }
    }
}

const EXPONENT_FORM_ABOVE: f64 = 1e21;
const EXPONENT_FORM_BELOW: f64 = 1e-6;

fn float_prefix(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let magnitude = f.abs();
    if magnitude >= EXPONENT_FORM_ABOVE || (magnitude != 0.0 && magnitude < EXPONENT_FORM_BELOW) {
        parse_integer_prefix(&format!("{f:e}"))
    } else {
        Some(f.trunc() as i64)
    }
}

fn parse_integer_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = match s.get(..2) {
        Some("0x") | Some("0X") => (16, &s[2..]),
        _ => (10, s),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else { break };
        seen = true;
        value = value
            .saturating_mul(i64::from(radix))
            .saturating_add(i64::from(d));
    }

    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}

// ---------------------------------------------------------------------------
// QuestionnaireAnswers
// ---------------------------------------------------------------------------

/// The screening-relevant subset of a patient intake form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawAnswers")]
pub struct QuestionnaireAnswers {
    pub takes_nitrates: ReportedItem,
    pub doctor_advised_no_sex: bool,
    pub severe_cardiac_condition: bool,
    pub is_pregnant: bool,
    pub systolic: BloodPressure,
    pub diastolic: BloodPressure,
    pub has_heart_attack: bool,
    pub has_stroke: bool,
    pub has_eye_disorder: bool,
    pub takes_ssris: ReportedItem,
    pub has_priapism: bool,
    pub has_kidney_disease: bool,
    pub has_liver_disease: bool,
    pub has_heart_condition: bool,
    pub takes_blood_pressure_meds: ReportedItem,
    pub is_breastfeeding: bool,
    pub oxytocin_allergy: bool,
    pub uterine_conditions: bool,
    pub has_diabetes: bool,
    pub trying_to_conceive: bool,
}

impl QuestionnaireAnswers {
    /// Read answers out of a raw intake form. Total: a non-object form or
    /// any unreadable field yields the "nothing reported" default for it.
    pub fn from_form(form: &Value) -> Self {
        // Arrays would otherwise deserialize positionally into the fields.
        if !form.is_object() {
            return Self::default();
        }
        Self::deserialize(form).unwrap_or_default()
    }
}

/// Wire shape of the intake form, keyed the way the patient form posts it.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawAnswers {
    #[serde(deserialize_with = "indicator")]
    takes_nitrates: bool,
    #[serde(deserialize_with = "detail_text")]
    nitrate_details: Option<String>,
    #[serde(deserialize_with = "indicator")]
    doctor_advised_no_sex: bool,
    #[serde(deserialize_with = "indicator")]
    severe_cardiac_condition: bool,
    #[serde(deserialize_with = "indicator")]
    is_pregnant: bool,
    #[serde(rename = "currentBPSystolic", deserialize_with = "pressure")]
    current_bp_systolic: BloodPressure,
    #[serde(rename = "currentBPDiastolic", deserialize_with = "pressure")]
    current_bp_diastolic: BloodPressure,
    #[serde(deserialize_with = "indicator")]
    has_heart_attack: bool,
    #[serde(deserialize_with = "indicator")]
    has_stroke: bool,
    #[serde(deserialize_with = "indicator")]
    has_eye_disorder: bool,
    #[serde(rename = "takesSSRIs", deserialize_with = "indicator")]
    takes_ssris: bool,
    #[serde(deserialize_with = "detail_text")]
    ssri_details: Option<String>,
    #[serde(deserialize_with = "indicator")]
    has_priapism: bool,
    #[serde(deserialize_with = "indicator")]
    has_kidney_disease: bool,
    #[serde(deserialize_with = "indicator")]
    has_liver_disease: bool,
    #[serde(deserialize_with = "indicator")]
    has_heart_condition: bool,
    #[serde(deserialize_with = "indicator")]
    takes_blood_pressure_meds: bool,
    #[serde(deserialize_with = "detail_text")]
    blood_pressure_med_details: Option<String>,
    #[serde(deserialize_with = "indicator")]
    is_breastfeeding: bool,
    #[serde(deserialize_with = "indicator")]
    oxytocin_allergy: bool,
    #[serde(deserialize_with = "indicator")]
    uterine_conditions: bool,
    #[serde(deserialize_with = "indicator")]
    has_diabetes: bool,
    #[serde(deserialize_with = "indicator")]
    trying_to_conceive: bool,
}

impl From<RawAnswers> for QuestionnaireAnswers {
    fn from(raw: RawAnswers) -> Self {
        Self {
            takes_nitrates: ReportedItem::new(raw.takes_nitrates, raw.nitrate_details),
            doctor_advised_no_sex: raw.doctor_advised_no_sex,
            severe_cardiac_condition: raw.severe_cardiac_condition,
            is_pregnant: raw.is_pregnant,
            systolic: raw.current_bp_systolic,
            diastolic: raw.current_bp_diastolic,
            has_heart_attack: raw.has_heart_attack,
            has_stroke: raw.has_stroke,
            has_eye_disorder: raw.has_eye_disorder,
            takes_ssris: ReportedItem::new(raw.takes_ssris, raw.ssri_details),
            has_priapism: raw.has_priapism,
            has_kidney_disease: raw.has_kidney_disease,
            has_liver_disease: raw.has_liver_disease,
            has_heart_condition: raw.has_heart_condition,
            takes_blood_pressure_meds: ReportedItem::new(
                raw.takes_blood_pressure_meds,
                raw.blood_pressure_med_details,
            ),
            is_breastfeeding: raw.is_breastfeeding,
            oxytocin_allergy: raw.oxytocin_allergy,
            uterine_conditions: raw.uterine_conditions,
            has_diabetes: raw.has_diabetes,
            trying_to_conceive: raw.trying_to_conceive,
        }
    }
}

/// Checkbox strings that explicitly mean "no".
pub const NEGATIVE_ANSWERS: &[&str] = &["false", "no", "off", "0"];

/// Whether an indicator answer reports the condition.
///
/// `null`, `false`, zero, blank text and the [`NEGATIVE_ANSWERS`] are no.
/// Everything else is yes, including free text such as a medication name,
/// arrays and objects.
pub(crate) fn is_affirmative(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => {
            let answer = s.trim().to_ascii_lowercase();
            !answer.is_empty() && !NEGATIVE_ANSWERS.contains(&answer.as_str())
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn indicator<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(is_affirmative(&value))
}

fn detail_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        _ => None,
    })
}

fn pressure<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BloodPressure, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(BloodPressure::from_value(&value))
}
