//! Small presentation helpers shared by the CLI and route layers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Returns a random lowercase base36 identifier.
pub fn generate_id() -> String {
    let mut value = Uuid::new_v4().as_u128();
    let mut digits = Vec::with_capacity(25);
    loop {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Formats a UTC instant as `Jan 15, 2024`.
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// [`format_date`] for stored epoch-millisecond timestamps.
///
/// Returns `None` when the value is outside chrono's supported range.
pub fn format_epoch_ms(epoch_ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms).map(format_date)
}

/// Uppercase first letters of the given names, `U` when both are blank.
pub fn get_initials(first_name: &str, last_name: &str) -> String {
    let initials = [first_name, last_name]
        .iter()
        .filter_map(|name| name.trim().chars().next())
        .flat_map(char::to_uppercase)
        .collect::<String>();
    if initials.is_empty() {
        "U".to_string()
    } else {
        initials
    }
}

#[cfg(test)]
mod tests {
    use super::{format_date, format_epoch_ms, generate_id, get_initials};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_base36_and_distinct() {
        let ids = (0..10_000).map(|_| generate_id()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 10_000);
        assert!(ids
            .iter()
            .all(|id| id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())));
    }

    #[test]
    fn format_date_uses_short_month_style() {
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(format_date(date), "Jan 15, 2024");
        let date = Utc.with_ymd_and_hms(2023, 12, 5, 0, 0, 0).unwrap();
        assert_eq!(format_date(date), "Dec 5, 2023");
    }

    #[test]
    fn format_epoch_ms_matches_format_date() {
        assert_eq!(format_epoch_ms(1_705_276_800_000).as_deref(), Some("Jan 15, 2024"));
        assert_eq!(format_epoch_ms(i64::MAX), None);
    }

    #[test]
    fn initials_fallback_to_u() {
        assert_eq!(get_initials("John", "Doe"), "JD");
        assert_eq!(get_initials("ada", "lovelace"), "AL");
        assert_eq!(get_initials("Grace", ""), "G");
        assert_eq!(get_initials("", "hopper"), "H");
        assert_eq!(get_initials("", ""), "U");
        assert_eq!(get_initials("  ", ""), "U");
    }
}
