use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::CycleType;
use crate::config;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub default_fee_per_review_cents: i64,
    pub payout_cycle_type: CycleType,
    pub updated_at: Option<NaiveDateTime>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            default_fee_per_review_cents: config::DEFAULT_FEE_PER_REVIEW_CENTS,
            payout_cycle_type: config::DEFAULT_PAYOUT_CYCLE,
            updated_at: None,
        }
    }
}

/// Partial settings update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub default_fee_per_review_cents: Option<i64>,
    pub payout_cycle_type: Option<CycleType>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.default_fee_per_review_cents.is_none() && self.payout_cycle_type.is_none()
    }
}
