//! Identifier and timestamp helpers shared by every crate.

use chrono::{NaiveDateTime, SubsecRound, Utc};
use uuid::Uuid;

/// Wire format for timestamps inside search documents.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Generates a dash-free UUID token (32 lowercase hex chars) for `bno`/`rno`.
pub fn generate_external_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// True when `id` looks like a token from [`generate_external_id`].
/// Upper-case hex is accepted since callers generate their own ids.
pub fn is_valid_external_id(id: &str) -> bool {
    id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Current UTC time at second precision.
pub fn current_datetime() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}

pub fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn generated_ids_are_dash_free_and_valid() {
        let id = generate_external_id();
        assert!(!id.contains('-'));
        assert!(is_valid_external_id(&id));
        assert_ne!(id, generate_external_id());
    }

    #[test]
    fn rejects_dashed_and_short_ids() {
        assert!(!is_valid_external_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_valid_external_id("abc"));
        assert!(!is_valid_external_id("zz0e8400e29b41d4a716446655440000"));
    }

    #[test]
    fn format_pads_early_years() {
        let dt = NaiveDate::from_ymd_opt(2, 1, 1)
            .unwrap()
            .and_hms_opt(1, 1, 1)
            .unwrap();
        assert_eq!(format_datetime(&dt), "0002-01-01 01:01:01");
    }
}
