use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(AssessmentStatus {
    Pending => "pending",
    Approved => "approved",
    Denied => "denied",
    Shipped => "shipped",
});

str_enum!(Decision {
    Approved => "approved",
    Denied => "denied",
});

impl Decision {
    /// Assessment status recorded for this decision.
    pub fn status(&self) -> AssessmentStatus {
        match self {
            Self::Approved => AssessmentStatus::Approved,
            Self::Denied => AssessmentStatus::Denied,
        }
    }

    pub fn audit_action(&self) -> AuditAction {
        match self {
            Self::Approved => AuditAction::Approve,
            Self::Denied => AuditAction::Deny,
        }
    }
}

str_enum!(ReviewerRole {
    Physician => "physician",
    Admin => "admin",
});

str_enum!(ReviewerStatus {
    Pending => "pending",
    Approved => "approved",
    Denied => "denied",
});

str_enum!(CycleType {
    Weekly => "weekly",
    Monthly => "monthly",
});

str_enum!(CycleStatus {
    Open => "open",
    Closed => "closed",
    Paid => "paid",
});

impl CycleStatus {
    /// Listing rank: open cycles first, paid last.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Closed => 1,
            Self::Paid => 2,
        }
    }
}

str_enum!(AuditAction {
    Submit => "submit",
    ViewQueue => "view_queue",
    View => "view",
    Approve => "approve",
    Deny => "deny",
    ApprovePhysician => "approve_physician",
    DenyPhysician => "deny_physician",
    ActivatePhysician => "activate_physician",
    DeactivatePhysician => "deactivate_physician",
    UpdateFee => "update_fee",
    UpdateSettings => "update_settings",
    MarkCyclePaid => "mark_cycle_paid",
    Ship => "ship",
});

str_enum!(EntityType {
    Assessment => "assessment",
    Physician => "physician",
    System => "system",
    PayoutCycle => "payout_cycle",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            AssessmentStatus::Pending,
            AssessmentStatus::Approved,
            AssessmentStatus::Denied,
            AssessmentStatus::Shipped,
        ] {
            assert_eq!(AssessmentStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_value_is_invalid_enum() {
        let err = CycleType::from_str("daily").unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::InvalidEnum { ref field, ref value } if field == "CycleType" && value == "daily"
        ));
    }

    #[test]
    fn decision_maps_to_status_and_action() {
        assert_eq!(Decision::Approved.status(), AssessmentStatus::Approved);
        assert_eq!(Decision::Denied.status(), AssessmentStatus::Denied);
        assert_eq!(Decision::Approved.audit_action().as_str(), "approve");
        assert_eq!(Decision::Denied.audit_action().as_str(), "deny");
    }

    #[test]
    fn serde_uses_stored_spelling() {
        let json = serde_json::to_string(&AuditAction::MarkCyclePaid).unwrap();
        assert_eq!(json, "\"mark_cycle_paid\"");
        let parsed: EntityType = serde_json::from_str("\"payout_cycle\"").unwrap();
        assert_eq!(parsed, EntityType::PayoutCycle);
    }

    #[test]
    fn cycle_rank_orders_open_first() {
        assert!(CycleStatus::Open.rank() < CycleStatus::Closed.rank());
        assert!(CycleStatus::Closed.rank() < CycleStatus::Paid.rank());
    }
}
