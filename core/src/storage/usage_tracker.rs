use super::json_file::{read_json, write_json};
use crate::Result;
use chrono::{Datelike, Duration, NaiveDate};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One day in a calendar month grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub count: u32,
}

/// Per-day activity counter backed by `usage_data.json`
#[derive(Debug)]
pub struct UsageTracker {
    path: PathBuf,
    days: BTreeMap<NaiveDate, u32>,
}

impl UsageTracker {
    /// Load the tracker from `path`. Missing or corrupt files yield an empty
    /// tracker; invalid date keys are dropped.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let days = if path.exists() {
            match read_json::<BTreeMap<String, u32>, _>(&path) {
                Ok(raw) => parse_days(raw),
                Err(err) => {
                    warn!("usage: ignoring unreadable {}: {}", path.display(), err);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        debug!("usage: {} days loaded from {}", days.len(), path.display());
        Self { path, days }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count one more action on `date` and persist.
    ///
    /// The in-memory count is updated even when the write fails.
    pub fn record(&mut self, date: NaiveDate) -> Result<u32> {
        let count = self.days.entry(date).or_insert(0);
        *count = count.saturating_add(1);
        let count = *count;
        self.save()?;
        Ok(count)
    }

    pub fn save(&self) -> Result<()> {
        let raw: BTreeMap<String, u32> = self
            .days
            .iter()
            .map(|(date, count)| (date.format("%Y-%m-%d").to_string(), *count))
            .collect();
        write_json(&self.path, &raw)
    }

    pub fn count(&self, date: NaiveDate) -> u32 {
        self.days.get(&date).copied().unwrap_or(0)
    }

    pub fn days_used(&self) -> usize {
        self.days.len()
    }

    /// Consecutive days with activity ending at `today`; 0 if today has none
    pub fn streak(&self, today: NaiveDate) -> u32 {
        let mut streak = 0;
        let mut day = today;
        while self.days.contains_key(&day) {
            streak += 1;
            day = match day.pred_opt() {
                Some(prev) => prev,
                None => break,
            };
        }
        streak
    }

    /// Longest run of consecutive active days ever recorded
    pub fn longest_streak(&self) -> u32 {
        let mut longest = 0;
        let mut run = 0;
        let mut previous: Option<NaiveDate> = None;
        for date in self.days.keys() {
            run = match previous {
                Some(prev) if *date - prev == Duration::days(1) => run + 1,
                _ => 1,
            };
            longest = longest.max(run);
            previous = Some(*date);
        }
        longest
    }

    /// Weeks of the month, Monday first; `None` pads days outside the month
    pub fn month_grid(&self, year: i32, month: u32) -> Vec<[Option<DayCell>; 7]> {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Vec::new();
        };
        let offset = first.weekday().num_days_from_monday() as usize;
        let days = days_in_month(year, month);

        let mut weeks = Vec::new();
        let mut week: [Option<DayCell>; 7] = [None; 7];
        for day in 1..=days {
            let cell_index = offset + day as usize - 1;
            let date = first + Duration::days(i64::from(day) - 1);
            week[cell_index % 7] = Some(DayCell {
                date,
                count: self.count(date),
            });
            if cell_index % 7 == 6 {
                weeks.push(week);
                week = [None; 7];
            }
        }
        if week.iter().any(Option::is_some) {
            weeks.push(week);
        }
        weeks
    }
}

fn parse_days(raw: BTreeMap<String, u32>) -> BTreeMap<NaiveDate, u32> {
    raw.into_iter()
        .filter_map(|(key, count)| match NaiveDate::parse_from_str(&key, "%Y-%m-%d") {
            Ok(date) => Some((date, count)),
            Err(_) => {
                warn!("usage: skipping invalid date key {:?}", key);
                None
            }
        })
        .collect()
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_record_twice_same_day() {
        let dir = tempdir().unwrap();
        let mut usage = UsageTracker::open(dir.path().join("usage_data.json"));
        assert_eq!(usage.record(date(2024, 10, 7)).unwrap(), 1);
        assert_eq!(usage.record(date(2024, 10, 7)).unwrap(), 2);
        assert_eq!(usage.count(date(2024, 10, 7)), 2);
        assert_eq!(usage.days_used(), 1);
    }

    #[test]
    fn test_record_persists_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("usage_data.json");
        let mut usage = UsageTracker::open(&path);
        usage.record(date(2024, 10, 7)).unwrap();
        usage.record(date(2024, 10, 8)).unwrap();

        let raw: BTreeMap<String, u32> = read_json(&path).unwrap();
        assert_eq!(raw.get("2024-10-07"), Some(&1));
        assert_eq!(raw.get("2024-10-08"), Some(&1));

        let reopened = UsageTracker::open(&path);
        assert_eq!(reopened.days_used(), 2);
    }

    #[test]
    fn test_record_saturates_at_max_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("usage_data.json");
        fs::write(&path, r#"{"2024-10-07": 4294967295}"#).unwrap();

        let mut tracker = UsageTracker::open(&path);
        let day = date(2024, 10, 7);
        assert_eq!(tracker.record(day).unwrap(), u32::MAX);
        assert_eq!(UsageTracker::open(&path).count(day), u32::MAX);
    }

    #[test]
    fn test_streak_consecutive_days() {
        let dir = tempdir().unwrap();
        let mut usage = UsageTracker::open(dir.path().join("usage_data.json"));
        usage.record(date(2024, 2, 28)).unwrap();
        usage.record(date(2024, 2, 29)).unwrap();
        assert_eq!(usage.streak(date(2024, 2, 29)), 2);
        assert_eq!(usage.streak(date(2024, 2, 28)), 1);
    }

    #[test]
    fn test_streak_resets_after_gap() {
        let dir = tempdir().unwrap();
        let mut usage = UsageTracker::open(dir.path().join("usage_data.json"));
        usage.record(date(2024, 10, 1)).unwrap();
        usage.record(date(2024, 10, 2)).unwrap();
        // Oct 3 skipped, nothing on Oct 4 either
        assert_eq!(usage.streak(date(2024, 10, 4)), 0);

        usage.record(date(2024, 10, 4)).unwrap();
        assert_eq!(usage.streak(date(2024, 10, 4)), 1);
        assert_eq!(usage.longest_streak(), 2);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let usage = UsageTracker::open(dir.path().join("absent.json"));
        assert_eq!(usage.days_used(), 0);
        assert_eq!(usage.streak(date(2024, 10, 7)), 0);
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("usage_data.json");
        fs::write(&path, "[1, 2, oops").unwrap();

        let mut usage = UsageTracker::open(&path);
        assert_eq!(usage.days_used(), 0);
        // Recording overwrites the corrupt file with a valid one
        usage.record(date(2024, 10, 7)).unwrap();
        assert_eq!(UsageTracker::open(&path).count(date(2024, 10, 7)), 1);
    }

    #[test]
    fn test_invalid_keys_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("usage_data.json");
        fs::write(&path, r#"{"2024-10-07": 3, "yesterday": 1}"#).unwrap();

        let usage = UsageTracker::open(&path);
        assert_eq!(usage.days_used(), 1);
        assert_eq!(usage.count(date(2024, 10, 7)), 3);
    }

    #[test]
    fn test_month_grid() {
        let dir = tempdir().unwrap();
        let mut usage = UsageTracker::open(dir.path().join("usage_data.json"));
        usage.record(date(2024, 10, 15)).unwrap();

        // October 2024 starts on a Tuesday and spans five grid rows
        let weeks = usage.month_grid(2024, 10);
        assert_eq!(weeks.len(), 5);
        assert!(weeks[0][0].is_none());
        assert_eq!(weeks[0][1].map(|c| c.date), Some(date(2024, 10, 1)));
        assert_eq!(weeks[4][3].map(|c| c.date), Some(date(2024, 10, 31)));
        assert!(weeks[4][4].is_none());

        let cell = weeks[2][1].unwrap();
        assert_eq!(cell.date, date(2024, 10, 15));
        assert_eq!(cell.count, 1);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
    }
}
