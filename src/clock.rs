//! Time handling: faction-local wall times, SQLite timestamps, Discord tags.

use crate::validate::ValidationError;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Meeting reminders fire this many minutes before the meeting instant.
pub const REMINDER_LEAD_MINUTES: i64 = 15;

const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

pub fn parse_zone(name: &str) -> Result<Tz, ValidationError> {
    name.parse::<Tz>()
        .map_err(|_| ValidationError::InvalidTimezone(name.to_string()))
}

/// Interprets a naive `YYYY-MM-DD HH:MM[:SS]` wall time in `tz` and converts
/// it to an absolute instant. Ambiguous local times (DST fall-back) resolve
/// to the earlier offset; nonexistent ones (spring-forward gap) are rejected.
pub fn local_to_utc(raw: &str, tz: Tz) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = raw.trim();
    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or(ValidationError::InvalidTime)?;
    let local = tz
        .from_local_datetime(&naive)
        .earliest()
        .ok_or(ValidationError::InvalidTime)?;
    Ok(local.with_timezone(&Utc))
}

pub fn ensure_future(instant: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ValidationError> {
    if instant > now {
        Ok(())
    } else {
        Err(ValidationError::TimeNotInFuture)
    }
}

/// Delay until the reminder trigger, or `None` when that trigger has already
/// passed (the reminder is then never armed).
pub fn reminder_delay(
    scheduled: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<std::time::Duration> {
    let trigger = scheduled - Duration::minutes(REMINDER_LEAD_MINUTES);
    if trigger <= now {
        return None;
    }
    (trigger - now).to_std().ok()
}

/// Delay from `now` until `deadline`, saturating at zero.
pub fn delay_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (deadline - now).to_std().unwrap_or(std::time::Duration::ZERO)
}

pub fn to_sqlite(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn parse_sqlite_utc(ts: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").ok()?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Discord timestamp tag, e.g. style `F` for full date, `R` for relative.
pub fn discord_timestamp(instant: DateTime<Utc>, style: char) -> String {
    format!("<t:{}:{}>", instant.timestamp(), style)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        parse_sqlite_utc(s).unwrap()
    }

    #[test]
    fn test_local_conversion_winter_and_summer() {
        let tz = parse_zone("America/New_York").unwrap();
        // EST is UTC-5
        assert_eq!(
            local_to_utc("2026-01-15 12:00", tz).unwrap(),
            utc("2026-01-15 17:00:00")
        );
        // EDT is UTC-4
        assert_eq!(
            local_to_utc("2026-07-15 12:00", tz).unwrap(),
            utc("2026-07-15 16:00:00")
        );
    }

    #[test]
    fn test_local_conversion_accepts_both_separators() {
        let tz = parse_zone("UTC").unwrap();
        assert_eq!(
            local_to_utc("2026-03-01T08:30", tz).unwrap(),
            utc("2026-03-01 08:30:00")
        );
        assert_eq!(
            local_to_utc("2026-03-01 08:30:45", tz).unwrap(),
            utc("2026-03-01 08:30:45")
        );
    }

    #[test]
    fn test_invalid_zone_and_time() {
        assert!(matches!(
            parse_zone("Mars/Olympus_Mons"),
            Err(ValidationError::InvalidTimezone(_))
        ));
        let tz = parse_zone("UTC").unwrap();
        assert_eq!(
            local_to_utc("next tuesday", tz),
            Err(ValidationError::InvalidTime)
        );
        // Spring-forward gap does not exist on the clock
        let ny = parse_zone("America/New_York").unwrap();
        assert_eq!(
            local_to_utc("2026-03-08 02:30", ny),
            Err(ValidationError::InvalidTime)
        );
    }

    #[test]
    fn test_ensure_future() {
        let now = utc("2026-06-01 12:00:00");
        assert!(ensure_future(utc("2026-06-01 12:00:01"), now).is_ok());
        assert_eq!(
            ensure_future(now, now),
            Err(ValidationError::TimeNotInFuture)
        );
        assert_eq!(
            ensure_future(utc("2026-05-31 12:00:00"), now),
            Err(ValidationError::TimeNotInFuture)
        );
    }

    #[test]
    fn test_reminder_arming() {
        let now = utc("2026-06-01 12:00:00");
        // 20 minutes out: reminder fires in 5 minutes
        assert_eq!(
            reminder_delay(utc("2026-06-01 12:20:00"), now),
            Some(std::time::Duration::from_secs(300))
        );
        // Less than the lead away: never armed
        assert_eq!(reminder_delay(utc("2026-06-01 12:10:00"), now), None);
        assert_eq!(reminder_delay(utc("2026-06-01 11:00:00"), now), None);
    }

    #[test]
    fn test_sqlite_roundtrip() {
        let instant = utc("2026-06-01 12:34:56");
        assert_eq!(parse_sqlite_utc(&to_sqlite(instant)), Some(instant));
        assert_eq!(discord_timestamp(instant, 'R'), format!("<t:{}:R>", instant.timestamp()));
    }
}
