use std::str::FromStr;

use rusqlite::{params, Connection};

use super::{format_ts, parse_opt_ts};
use crate::db::DatabaseError;
use crate::models::enums::CycleType;
use crate::models::SystemSettings;

/// Read the singleton settings row, creating it with defaults when missing.
pub fn get_or_create_settings(conn: &Connection) -> Result<SystemSettings, DatabaseError> {
    let defaults = SystemSettings::default();
    conn.execute(
        "INSERT OR IGNORE INTO system_settings (id, default_fee_per_review_cents, payout_cycle_type)
         VALUES (1, ?1, ?2)",
        params![
            defaults.default_fee_per_review_cents,
            defaults.payout_cycle_type.as_str(),
        ],
    )?;

    let (fee, cycle_type, updated_at) = conn.query_row(
        "SELECT default_fee_per_review_cents, payout_cycle_type, updated_at
         FROM system_settings WHERE id = 1",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        },
    )?;

    Ok(SystemSettings {
        default_fee_per_review_cents: fee,
        payout_cycle_type: CycleType::from_str(&cycle_type)?,
        updated_at: parse_opt_ts("system_settings.updated_at", updated_at)?,
    })
}

/// Upsert the singleton settings row.
pub fn save_settings(conn: &Connection, settings: &SystemSettings) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO system_settings (id, default_fee_per_review_cents, payout_cycle_type, updated_at)
         VALUES (1, ?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
            default_fee_per_review_cents = excluded.default_fee_per_review_cents,
            payout_cycle_type = excluded.payout_cycle_type,
            updated_at = excluded.updated_at",
        params![
            settings.default_fee_per_review_cents,
            settings.payout_cycle_type.as_str(),
            settings.updated_at.as_ref().map(format_ts),
        ],
    )?;
    Ok(())
}
