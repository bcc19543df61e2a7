//! Deadline-based timers polled from the UI tick.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Autosave settings, read from the `[autosave]` table of `config.toml`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveSettings {
    pub enabled: bool,
    /// Quiet period after the last edit before saving
    pub delay_secs: u64,
    /// Period of the backup save
    pub backup_interval_secs: u64,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_secs: 2,
            backup_interval_secs: 60,
        }
    }
}

/// Fires once, `delay` after the most recent `schedule` call
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    /// Cancel any pending deadline and start a new one from `now`
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once when the deadline has passed
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Fires every `period`; each firing schedules the next one from `now`
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    next: Option<Instant>,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    pub fn start(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if now >= next => {
                self.next = Some(now + self.period);
                true
            }
            _ => false,
        }
    }
}

/// Which timer asked for a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveTrigger {
    Debounce,
    Backup,
}

/// The debounce and backup timers of the reader
#[derive(Debug, Clone)]
pub struct AutosaveTimers {
    enabled: bool,
    debounce: Debounce,
    backup: Interval,
}

impl AutosaveTimers {
    pub fn new(settings: AutosaveSettings, now: Instant) -> Self {
        let mut timers = Self {
            enabled: false,
            debounce: Debounce::new(Duration::from_secs(settings.delay_secs)),
            backup: Interval::new(Duration::from_secs(settings.backup_interval_secs.max(1))),
        };
        timers.set_enabled(settings.enabled, now);
        timers
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool, now: Instant) {
        self.enabled = enabled;
        if enabled {
            if !self.backup.is_running() {
                self.backup.start(now);
            }
        } else {
            self.debounce.cancel();
            self.backup.stop();
        }
    }

    /// An edit happened: push the debounce deadline out
    pub fn note_edited(&mut self, now: Instant) {
        if self.enabled {
            self.debounce.schedule(now);
        }
    }

    /// A save happened by other means; the pending debounce is moot
    pub fn saved(&mut self) {
        self.debounce.cancel();
    }

    /// The timer due at `now`, if any. The debounce wins when both are due.
    pub fn poll(&mut self, now: Instant) -> Option<AutosaveTrigger> {
        let debounce = self.debounce.poll(now);
        let backup = self.backup.poll(now);
        if debounce {
            Some(AutosaveTrigger::Debounce)
        } else if backup {
            Some(AutosaveTrigger::Backup)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_reschedules_on_every_edit() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_secs(2));
        debounce.schedule(start);
        debounce.schedule(start + Duration::from_secs(1));

        assert!(!debounce.poll(start + Duration::from_secs(2)));
        assert!(debounce.poll(start + Duration::from_secs(3)));
        // Fires once
        assert!(!debounce.poll(start + Duration::from_secs(10)));
    }

    #[test]
    fn test_debounce_cancel() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_secs(2));
        debounce.schedule(start);
        debounce.cancel();
        assert!(!debounce.is_pending());
        assert!(!debounce.poll(start + Duration::from_secs(5)));
    }

    #[test]
    fn test_interval_keeps_firing() {
        let start = Instant::now();
        let mut interval = Interval::new(Duration::from_secs(60));
        assert!(!interval.poll(start + Duration::from_secs(120)));

        interval.start(start);
        assert!(!interval.poll(start + Duration::from_secs(59)));
        assert!(interval.poll(start + Duration::from_secs(60)));
        assert!(!interval.poll(start + Duration::from_secs(100)));
        assert!(interval.poll(start + Duration::from_secs(120)));
    }

    #[test]
    fn test_timers_disabled() {
        let start = Instant::now();
        let settings = AutosaveSettings {
            enabled: false,
            ..AutosaveSettings::default()
        };
        let mut timers = AutosaveTimers::new(settings, start);
        timers.note_edited(start);
        assert_eq!(timers.poll(start + Duration::from_secs(600)), None);

        timers.set_enabled(true, start);
        timers.note_edited(start);
        assert_eq!(
            timers.poll(start + Duration::from_secs(2)),
            Some(AutosaveTrigger::Debounce)
        );
    }

    #[test]
    fn test_timers_backup_fires_without_edits() {
        let start = Instant::now();
        let mut timers = AutosaveTimers::new(AutosaveSettings::default(), start);
        assert_eq!(timers.poll(start + Duration::from_secs(30)), None);
        assert_eq!(
            timers.poll(start + Duration::from_secs(60)),
            Some(AutosaveTrigger::Backup)
        );
    }

    #[test]
    fn test_saved_cancels_pending_debounce() {
        let start = Instant::now();
        let mut timers = AutosaveTimers::new(AutosaveSettings::default(), start);
        timers.note_edited(start);
        timers.saved();
        assert_eq!(timers.poll(start + Duration::from_secs(5)), None);
    }
}
