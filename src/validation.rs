//! Pre-flight checks run before a request is built. Failures are
//! `ExecError::Validation` and never reach the network.

use crate::dates;
use crate::error::ExecError;
use rust_decimal::Decimal;
use std::ops::RangeInclusive;

/// Result count for tiercé / quinté combinations.
pub const COMBINATION_LIMIT: RangeInclusive<i64> = 1..=50;
/// Result count for the daily top bets / top combinations.
pub const DAILY_LIMIT: RangeInclusive<i64> = 1..=20;

pub const MIN_BANKROLL: Decimal = Decimal::from_parts(10, 0, 0, false, 0);
pub const MAX_BANKROLL: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

pub fn positive_id(id: i64, what: &str) -> Result<u64, ExecError> {
    if id <= 0 {
        return Err(ExecError::validation(format!(
            "{what} must be a positive integer, got {id}"
        )));
    }
    Ok(id as u64)
}

pub fn clamp_limit(limit: i64, range: RangeInclusive<i64>) -> u32 {
    limit.clamp(*range.start(), *range.end()) as u32
}

pub fn clamp_bankroll(bankroll: Decimal) -> Decimal {
    bankroll.clamp(MIN_BANKROLL, MAX_BANKROLL)
}

/// Date for a provider path: `DDMMYYYY`. ISO input is converted, `None`
/// means today.
pub fn compact_date(date: Option<&str>) -> Result<String, ExecError> {
    match date {
        None => Ok(dates::today_compact()),
        Some(d) if d.len() == 10 => dates::try_compact_from_iso(d),
        Some(d) => dates::parse_compact(d)
            .map(dates::compact_from_date)
            .ok_or_else(|| ExecError::validation(format!("invalid date: {d:?}"))),
    }
}

/// Date for a backend query: `YYYY-MM-DD`. Compact input is converted,
/// `None` means today.
pub fn iso_date(date: Option<&str>) -> Result<String, ExecError> {
    match date {
        None => Ok(dates::today_iso()),
        Some(d) if d.len() == 8 => dates::try_iso_from_compact(d),
        Some(d) => dates::parse_iso(d)
            .map(dates::iso_from_date)
            .ok_or_else(|| ExecError::validation(format!("invalid date: {d:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positive_id() {
        assert_eq!(positive_id(42, "race id").unwrap(), 42);
        assert!(matches!(positive_id(0, "race id"), Err(ExecError::Validation(_))));
        assert!(matches!(positive_id(-1, "race id"), Err(ExecError::Validation(_))));
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(500, COMBINATION_LIMIT), 50);
        assert_eq!(clamp_limit(0, COMBINATION_LIMIT), 1);
        assert_eq!(clamp_limit(-7, COMBINATION_LIMIT), 1);
        assert_eq!(clamp_limit(10, COMBINATION_LIMIT), 10);
        assert_eq!(clamp_limit(21, DAILY_LIMIT), 20);
    }

    #[test]
    fn test_clamp_bankroll() {
        assert_eq!(MIN_BANKROLL, dec!(10));
        assert_eq!(MAX_BANKROLL, dec!(1000000));
        assert_eq!(clamp_bankroll(dec!(5)), dec!(10));
        assert_eq!(clamp_bankroll(dec!(2500000)), dec!(1000000));
        assert_eq!(clamp_bankroll(dec!(1000.50)), dec!(1000.50));
    }

    #[test]
    fn test_compact_date() {
        assert_eq!(compact_date(Some("17102026")).unwrap(), "17102026");
        assert_eq!(compact_date(Some("2026-10-17")).unwrap(), "17102026");
        assert_eq!(compact_date(None).unwrap().len(), 8);
        assert!(compact_date(Some("1710")).is_err());
        assert!(compact_date(Some("32102026")).is_err());
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(iso_date(Some("2026-10-17")).unwrap(), "2026-10-17");
        assert_eq!(iso_date(Some("17102026")).unwrap(), "2026-10-17");
        assert_eq!(iso_date(None).unwrap().len(), 10);
        assert!(iso_date(Some("yesterday")).is_err());
    }

    #[test]
    fn test_iso_date_rejects_non_canonical_forms() {
        for input in ["2026- 1- 7", " 2026-1-07", "+2026-1-07", "2026-1-07 ", "2026/10/17"] {
            assert!(iso_date(Some(input)).is_err(), "{input:?}");
            assert!(compact_date(Some(input)).is_err(), "{input:?}");
        }
        assert!(iso_date(Some("2026-02-30")).is_err());
    }
}
