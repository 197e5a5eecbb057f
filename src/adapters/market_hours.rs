//! Market gates
//!
//! `MarketHoursGate` checks a weekday trading window at a fixed UTC offset.
//! Exchange holidays are not modelled.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc, Weekday};

use crate::agents::MarketGate;
use crate::config::MarketConfig;
use crate::error::{FloorError, Result};

/// Gate that is always open (24/7 markets, tests)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

#[async_trait]
impl MarketGate for AlwaysOpen {
    async fn is_open(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Regular-session window, Monday to Friday
#[derive(Debug, Clone)]
pub struct MarketHoursGate {
    offset: FixedOffset,
    open: NaiveTime,
    close: NaiveTime,
}

impl MarketHoursGate {
    pub fn new(utc_offset_minutes: i32, open: NaiveTime, close: NaiveTime) -> Result<Self> {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                FloorError::Validation(format!("invalid UTC offset: {utc_offset_minutes} minutes"))
            })?;
        if open >= close {
            return Err(FloorError::Validation(format!(
                "market open {open} must be before close {close}"
            )));
        }
        Ok(Self {
            offset,
            open,
            close,
        })
    }

    /// NYSE regular hours, 09:30-16:00 at UTC-5
    pub fn us_equities() -> Result<Self> {
        Self::new(-5 * 60, parse_time("09:30")?, parse_time("16:00")?)
    }

    pub fn from_config(config: &MarketConfig) -> Result<Self> {
        Self::new(
            config.utc_offset_minutes,
            parse_time(&config.open)?,
            parse_time(&config.close)?,
        )
    }

    /// Whether the window contains `at`
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.offset);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let time = local.time();
        time >= self.open && time < self.close
    }
}

#[async_trait]
impl MarketGate for MarketHoursGate {
    async fn is_open(&self) -> Result<bool> {
        Ok(self.is_open_at(Utc::now()))
    }
}

/// Parse an "HH:MM" wall-clock time
pub fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| FloorError::Validation(format!("invalid time {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_us_equities_window() {
        let gate = MarketHoursGate::us_equities().unwrap();

        // Wednesday 2024-01-10: 14:30 UTC is 09:30 at UTC-5
        assert!(!gate.is_open_at(utc(2024, 1, 10, 14, 29)));
        assert!(gate.is_open_at(utc(2024, 1, 10, 14, 30)));
        assert!(gate.is_open_at(utc(2024, 1, 10, 20, 59)));
        assert!(!gate.is_open_at(utc(2024, 1, 10, 21, 0)));
    }

    #[test]
    fn test_weekend_is_closed() {
        let gate = MarketHoursGate::us_equities().unwrap();
        // Saturday 2024-01-13, mid-session time
        assert!(!gate.is_open_at(utc(2024, 1, 13, 16, 0)));
    }

    #[test]
    fn test_weekday_uses_local_date() {
        // UTC+9: Monday 08:00 local is still Sunday in UTC
        let gate = MarketHoursGate::new(
            9 * 60,
            parse_time("08:00").unwrap(),
            parse_time("15:00").unwrap(),
        )
        .unwrap();
        assert!(gate.is_open_at(utc(2024, 1, 14, 23, 30)));
    }

    #[test]
    fn test_rejects_inverted_window() {
        let err = MarketHoursGate::new(0, parse_time("16:00").unwrap(), parse_time("09:30").unwrap())
            .unwrap_err();
        assert!(matches!(err, FloorError::Validation(_)));
    }

    #[test]
    fn test_rejects_out_of_range_offset() {
        let config = MarketConfig {
            utc_offset_minutes: 40_000_000,
            ..MarketConfig::default()
        };
        let err = MarketHoursGate::from_config(&config).unwrap_err();
        assert!(matches!(err, FloorError::Validation(ref msg) if msg.contains("40000000")));

        let (open, close) = (parse_time("09:00").unwrap(), parse_time("17:00").unwrap());
        assert!(MarketHoursGate::new(24 * 60, open, close).is_err());
        assert!(MarketHoursGate::new(i32::MIN, open, close).is_err());
        assert!(MarketHoursGate::new(-(23 * 60 + 59), open, close).is_ok());
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        assert!(parse_time("9h30").is_err());
    }

    #[tokio::test]
    async fn test_always_open() {
        assert!(AlwaysOpen.is_open().await.unwrap());
    }
}
