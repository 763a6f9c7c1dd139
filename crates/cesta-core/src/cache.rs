//! Cache identity and the local-day window.
//!
//! A search is served from the store when a record with the same
//! [`CacheKey`] was created inside the current local calendar day
//! (`00:00:00.000` to `23:59:59.999` in the server's time zone).

use std::fmt;

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Identity under which a search is cached: the canonical essential item
/// when the term resolved to one, otherwise the trimmed raw term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_search(item: Option<&str>, term: &str) -> Self {
        match item {
            Some(item) => Self(item.to_string()),
            None => Self(term.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The local calendar day containing some instant, as a closed UTC range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub day: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// The window for the current day in the server's local time zone.
    pub fn today() -> Self {
        Self::containing(&Local, Utc::now())
    }

    /// The window of the day, in `tz`, that contains `instant`.
    pub fn containing<Tz: TimeZone>(tz: &Tz, instant: DateTime<Utc>) -> Self {
        let day = instant.with_timezone(tz).date_naive();
        let midnight = day.and_time(NaiveTime::MIN);
        let next_midnight = midnight + Duration::days(1);

        Self {
            day,
            start: resolve_local(tz, midnight),
            end: resolve_local(tz, next_midnight) - Duration::milliseconds(1),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// The day as `YYYY-MM-DD`.
    pub fn day_key(&self) -> String {
        self.day.format("%Y-%m-%d").to_string()
    }
}

/// Map a local wall-clock time to UTC. Times skipped by a DST jump resolve
/// to the first valid instant after them.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => at.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let mut probe = naive;
            for _ in 0..24 * 4 {
                probe += Duration::minutes(15);
                if let Some(at) = tz.from_local_datetime(&probe).earliest() {
                    return at.with_timezone(&Utc);
                }
            }
            naive.and_utc()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn cache_key_prefers_canonical_item() {
        assert_eq!(
            CacheKey::for_search(Some("Arroz 5kg"), " arroz 5KG ").as_str(),
            "Arroz 5kg"
        );
        assert_eq!(
            CacheKey::for_search(None, "  sabão em pó ").as_str(),
            "sabão em pó"
        );
    }

    #[test]
    fn window_spans_the_local_day() {
        let sao_paulo = FixedOffset::west_opt(3 * 3600).unwrap();
        let instant = Utc.with_ymd_and_hms(2024, 3, 10, 2, 30, 0).unwrap();

        let window = DayWindow::containing(&sao_paulo, instant);

        assert_eq!(window.day_key(), "2024-03-09");
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 9, 3, 0, 0).unwrap());
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2024, 3, 10, 3, 0, 0).unwrap() - Duration::milliseconds(1)
        );
        assert!(window.contains(instant));
        assert!(!window.contains(window.end + Duration::milliseconds(1)));
        assert!(!window.contains(window.start - Duration::milliseconds(1)));
    }

    #[test]
    fn today_starts_before_it_ends() {
        let window = DayWindow::today();
        assert!(window.start < window.end);
        assert_eq!(window.day_key().len(), 10);
    }
}
