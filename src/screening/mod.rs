//! Questionnaire risk screening.
//!
//! Maps patient-reported answers onto safety flags and two verdicts:
//! auto-disqualification and review required. Everything in here is pure.
//! No I/O, no logging, no clock; callers log and persist the result.

pub mod engine;
pub mod messages;
pub mod questionnaire;
pub mod rules;
pub mod types;

pub use engine::evaluate;
pub use questionnaire::{BloodPressure, QuestionnaireAnswers, ReportedItem};
pub use types::{FlagCode, FlagSeverity, FlagType, RiskAnalysisResult, RiskFlag, RiskSummary};
