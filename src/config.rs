use std::path::PathBuf;

use crate::models::enums::CycleType;

/// Application-level constants
pub const APP_NAME: &str = "IntakeGuard";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable that relocates the data directory.
pub const DATA_DIR_ENV: &str = "INTAKE_DATA_DIR";

pub const DATABASE_FILE: &str = "intake.db";

/// Fee credited per decision to newly approved reviewers ($5.00).
pub const DEFAULT_FEE_PER_REVIEW_CENTS: i64 = 500;
pub const DEFAULT_PAYOUT_CYCLE: CycleType = CycleType::Weekly;

/// Tracing filter used when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "intakeguard_lib=info,warn"
}

/// Pick the data directory: explicit override, else ~/IntakeGuard.
/// Falls back to the working directory when no home directory exists.
pub fn resolve_data_dir(override_dir: Option<PathBuf>) -> PathBuf {
    match override_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME),
    }
}

/// Get the application data directory
pub fn app_data_dir() -> PathBuf {
    resolve_data_dir(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

/// Location of the intake database inside the data directory.
pub fn database_path() -> PathBuf {
    app_data_dir().join(DATABASE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/srv/intake")));
        assert_eq!(dir, PathBuf::from("/srv/intake"));
    }

    #[test]
    fn empty_override_is_ignored() {
        let dir = resolve_data_dir(Some(PathBuf::new()));
        assert!(dir.ends_with(APP_NAME));
    }

    #[test]
    fn default_dir_under_home() {
        let dir = resolve_data_dir(None);
        if let Some(home) = dirs::home_dir() {
            assert!(dir.starts_with(home));
        }
        assert!(dir.ends_with("IntakeGuard"));
    }

    #[test]
    fn database_lives_in_data_dir() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with(DATABASE_FILE));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn default_fee_is_five_dollars() {
        assert_eq!(DEFAULT_FEE_PER_REVIEW_CENTS, 500);
        assert_eq!(DEFAULT_PAYOUT_CYCLE, CycleType::Weekly);
    }
}
