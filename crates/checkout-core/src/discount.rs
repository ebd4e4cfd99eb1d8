//! Discount Window
//!
//! The launch discount runs for 48 hours from a visitor's first observed
//! visit. The start time is stored once under [`COUNTDOWN_START_KEY`] (ms
//! since epoch) and never rewritten, so expiry is one-way.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{KeyValueStore, MemoryStore};

/// Storage key for the window start (milliseconds since epoch)
pub const COUNTDOWN_START_KEY: &str = "countdown_start";

/// Window length: 48 hours = 172,800,000 ms
pub const WINDOW_DURATION_MS: i64 = 172_800_000;

/// Below this the countdown is shown as urgent
const LOW_TIME_MS: i64 = 6 * 60 * 60 * 1000;

/// Visitor store size above which expired visitors are forgotten
pub const VISITOR_HIGH_WATER_MARK: usize = 10_000;

/// Tracks one visitor's discount window
pub struct DiscountWindow<S: KeyValueStore> {
    store: S,
    duration: Duration,
}

impl<S: KeyValueStore> DiscountWindow<S> {
    /// Standard 48-hour window
    pub fn new(store: S) -> Self {
        Self::with_duration(store, Duration::milliseconds(WINDOW_DURATION_MS))
    }

    pub const fn with_duration(store: S, duration: Duration) -> Self {
        Self { store, duration }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Is the discount active right now?
    pub fn is_active(&self) -> Result<bool> {
        self.is_active_at(Utc::now())
    }

    /// Is the discount active at `now`? Never writes.
    ///
    /// A visitor without a stored start is on their first visit, so the
    /// discount is active.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> Result<bool> {
        match self.stored_start()? {
            None => Ok(true),
            Some(start) => Ok(now < window_end(start, self.duration)),
        }
    }

    /// Return the window start, recording `now` if there is none yet.
    ///
    /// Concurrent first visits may race; whichever write lands first wins
    /// and every caller sees that value. An unreadable stored value is
    /// replaced with `now` so later calls agree on it.
    pub fn ensure_started_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if let Some(start) = self.stored_start()? {
            return Ok(start);
        }

        let value = now.timestamp_millis().to_string();
        let stored = self.store.set_if_absent(COUNTDOWN_START_KEY, &value)?;

        if let Some(start) = parse_millis(&stored) {
            tracing::debug!(start = %start, "Discount window started");
            return Ok(start);
        }

        self.store.set(COUNTDOWN_START_KEY, &value)?;
        tracing::debug!(start = %now, "Discount window restarted over unreadable value");
        Ok(now)
    }

    /// Get-or-create the start time and report what is left
    pub fn countdown_at(&self, now: DateTime<Utc>) -> Result<Countdown> {
        let start = self.ensure_started_at(now)?;
        Ok(Countdown::new(window_end(start, self.duration), now))
    }

    pub fn countdown(&self) -> Result<Countdown> {
        self.countdown_at(Utc::now())
    }

    /// A stored value that does not parse is treated as absent
    fn stored_start(&self) -> Result<Option<DateTime<Utc>>> {
        let raw = self.store.get(COUNTDOWN_START_KEY)?;
        Ok(raw.as_deref().and_then(|value| {
            let parsed = parse_millis(value);
            if parsed.is_none() {
                tracing::warn!(value, "Ignoring unreadable countdown start");
            }
            parsed
        }))
    }
}

fn window_end(start: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    start
        .checked_add_signed(duration)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Forget every visitor whose standard window ended at or before `now`,
/// but only once `store` holds more than `high_water_mark` keys.
///
/// Keys are expected as `{visitor}:{key}` (see [`crate::ScopedStore`]).
/// A forgotten visitor starts over on their next visit. Returns the
/// number of keys removed.
pub fn sweep_expired_visitors(
    store: &MemoryStore,
    now: DateTime<Utc>,
    high_water_mark: usize,
) -> usize {
    if store.len() <= high_water_mark {
        return 0;
    }

    let duration = Duration::milliseconds(WINDOW_DURATION_MS);
    let suffix = format!(":{COUNTDOWN_START_KEY}");
    let mut expired = HashSet::new();

    let mut swept = store.retain(|key, value| {
        let Some(visitor) = key.strip_suffix(suffix.as_str()) else {
            return true;
        };
        let ended = parse_millis(value).is_some_and(|start| window_end(start, duration) <= now);
        if ended {
            expired.insert(visitor.to_string());
        }
        !ended
    });

    if !expired.is_empty() {
        swept += store.retain(|key, _| {
            key.split_once(':')
                .is_none_or(|(visitor, _)| !expired.contains(visitor))
        });
    }

    tracing::debug!(
        swept,
        visitors = expired.len(),
        remaining = store.len(),
        "Swept expired visitors"
    );
    swept
}

fn parse_millis(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

/// Snapshot of the time left in a window
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub ends_at: DateTime<Utc>,
    pub remaining_ms: i64,
    pub is_expired: bool,
}

impl Countdown {
    pub fn new(ends_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining_ms = (ends_at - now).num_milliseconds();
        Self {
            ends_at,
            remaining_ms: remaining_ms.max(0),
            is_expired: remaining_ms <= 0,
        }
    }

    /// Under six hours left
    pub const fn is_low_time(&self) -> bool {
        self.remaining_ms < LOW_TIME_MS
    }
}

impl fmt::Display for Countdown {
    /// `HH:MM:SS`; hours are not wrapped at 24
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.remaining_ms / 1000;
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Result of one countdown tick
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Still counting down
    Running(Countdown),
    /// The deadline was just reached; reported exactly once
    Expired,
    /// Expired earlier; nothing to show
    Hidden,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerState {
    Uninitialized,
    Running(DateTime<Utc>),
    Expired,
}

/// Drives a countdown display: `Uninitialized → Running → Expired`.
///
/// Call [`CountdownTimer::tick`] once per second. Once expired it stays
/// expired for the same stored start time.
#[derive(Debug)]
pub struct CountdownTimer {
    state: TimerState,
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl CountdownTimer {
    pub const fn new() -> Self {
        Self {
            state: TimerState::Uninitialized,
        }
    }

    pub fn tick<S: KeyValueStore>(
        &mut self,
        window: &DiscountWindow<S>,
        now: DateTime<Utc>,
    ) -> Result<Tick> {
        let ends_at = match self.state {
            TimerState::Expired => return Ok(Tick::Hidden),
            TimerState::Running(ends_at) => ends_at,
            TimerState::Uninitialized => {
                let ends_at = window.countdown_at(now)?.ends_at;
                self.state = TimerState::Running(ends_at);
                ends_at
            }
        };

        let countdown = Countdown::new(ends_at, now);
        if countdown.is_expired {
            self.state = TimerState::Expired;
            tracing::debug!(ends_at = %ends_at, "Discount countdown expired");
            return Ok(Tick::Expired);
        }

        Ok(Tick::Running(countdown))
    }

    pub const fn is_expired(&self) -> bool {
        matches!(self.state, TimerState::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn window_started_at(start_ms: i64) -> DiscountWindow<MemoryStore> {
        let store = MemoryStore::new();
        store.set(COUNTDOWN_START_KEY, &start_ms.to_string()).unwrap();
        DiscountWindow::new(store)
    }

    const NOW: i64 = 1_760_000_000_000;

    #[test]
    fn test_first_visit_is_active_without_writing() {
        let window = DiscountWindow::new(MemoryStore::new());
        assert!(window.is_active_at(at(NOW)).unwrap());
        assert!(window.store().is_empty());
    }

    #[test]
    fn test_fresh_start_is_active() {
        let window = window_started_at(NOW);
        assert!(window.is_active_at(at(NOW)).unwrap());
    }

    #[test]
    fn test_expired_window() {
        let window = window_started_at(NOW - WINDOW_DURATION_MS - 1);
        assert!(!window.is_active_at(at(NOW)).unwrap());
    }

    #[test]
    fn test_exact_deadline_is_expired() {
        let window = window_started_at(NOW - WINDOW_DURATION_MS);
        assert!(!window.is_active_at(at(NOW)).unwrap());
        assert!(window.countdown_at(at(NOW)).unwrap().is_expired);
    }

    #[test]
    fn test_is_active_is_idempotent() {
        let window = window_started_at(NOW - 1000);
        let first = window.is_active_at(at(NOW)).unwrap();
        for _ in 0..3 {
            assert_eq!(window.is_active_at(at(NOW)).unwrap(), first);
        }
    }

    #[test]
    fn test_ensure_started_keeps_first_value() {
        let window = DiscountWindow::new(MemoryStore::new());
        let start = window.ensure_started_at(at(NOW)).unwrap();
        let again = window.ensure_started_at(at(NOW + 5000)).unwrap();
        assert_eq!(start, at(NOW));
        assert_eq!(again, at(NOW));
        assert_eq!(
            window.store().get(COUNTDOWN_START_KEY).unwrap().as_deref(),
            Some(NOW.to_string().as_str())
        );
    }

    #[test]
    fn test_unreadable_start_counts_as_first_visit() {
        let store = MemoryStore::new();
        store.set(COUNTDOWN_START_KEY, "not-a-number").unwrap();
        let window = DiscountWindow::new(store);
        assert!(window.is_active_at(at(NOW)).unwrap());
    }

    #[test]
    fn test_unreadable_start_is_replaced_once() {
        let store = MemoryStore::new();
        store.set(COUNTDOWN_START_KEY, "garbage").unwrap();
        let window = DiscountWindow::new(store);

        let start = window.ensure_started_at(at(NOW)).unwrap();
        let later = window.ensure_started_at(at(NOW + 480 * 3_600_000)).unwrap();
        assert_eq!(start, at(NOW));
        assert_eq!(later, at(NOW));

        let countdown = window.countdown_at(at(NOW + WINDOW_DURATION_MS)).unwrap();
        assert!(countdown.is_expired);
        assert!(!window.is_active_at(at(NOW + WINDOW_DURATION_MS)).unwrap());
    }

    #[test]
    fn test_start_near_end_of_time_does_not_overflow() {
        let max_ms = DateTime::<Utc>::MAX_UTC.timestamp_millis();
        let window = window_started_at(max_ms - 1000);
        assert!(window.is_active_at(at(NOW)).unwrap());
        assert_eq!(window.countdown_at(at(NOW)).unwrap().ends_at, DateTime::<Utc>::MAX_UTC);
    }

    fn visitor_started_at(store: &MemoryStore, visitor: &str, start_ms: i64) {
        store
            .set(&format!("{visitor}:{COUNTDOWN_START_KEY}"), &start_ms.to_string())
            .unwrap();
        store
            .set(&format!("{visitor}:ab_test_variant"), "variant_a")
            .unwrap();
    }

    #[test]
    fn test_sweep_forgets_expired_visitors() {
        let store = MemoryStore::new();
        visitor_started_at(&store, "old", NOW - WINDOW_DURATION_MS);
        visitor_started_at(&store, "fresh", NOW - 1000);
        store.set("no-window:ab_test_variant", "variant_b").unwrap();

        assert_eq!(sweep_expired_visitors(&store, at(NOW), 4), 2);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get("old:ab_test_variant").unwrap(), None);
        assert!(store.get("fresh:countdown_start").unwrap().is_some());
        assert!(store.get("no-window:ab_test_variant").unwrap().is_some());
    }

    #[test]
    fn test_no_visitor_sweep_below_high_water_mark() {
        let store = MemoryStore::new();
        visitor_started_at(&store, "old", NOW - WINDOW_DURATION_MS * 2);

        assert_eq!(sweep_expired_visitors(&store, at(NOW), VISITOR_HIGH_WATER_MARK), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_countdown_format() {
        let window = DiscountWindow::new(MemoryStore::new());
        let countdown = window.countdown_at(at(NOW)).unwrap();
        assert_eq!(countdown.remaining_ms, WINDOW_DURATION_MS);
        assert_eq!(countdown.to_string(), "48:00:00");
        assert!(!countdown.is_low_time());

        let late = window.countdown_at(at(NOW + WINDOW_DURATION_MS - 3_723_000)).unwrap();
        assert_eq!(late.to_string(), "01:02:03");
        assert!(late.is_low_time());
    }

    #[test]
    fn test_timer_expires_once() {
        let window = DiscountWindow::new(MemoryStore::new());
        let mut timer = CountdownTimer::new();

        assert!(matches!(timer.tick(&window, at(NOW)).unwrap(), Tick::Running(_)));
        match timer.tick(&window, at(NOW + 1000)).unwrap() {
            Tick::Running(countdown) => assert_eq!(countdown.remaining_ms, WINDOW_DURATION_MS - 1000),
            other => panic!("expected running, got {other:?}"),
        }

        let deadline = NOW + WINDOW_DURATION_MS;
        assert_eq!(timer.tick(&window, at(deadline)).unwrap(), Tick::Expired);
        assert_eq!(timer.tick(&window, at(deadline + 1000)).unwrap(), Tick::Hidden);
        assert!(timer.is_expired());
    }

    #[test]
    fn test_timer_on_already_expired_window() {
        let window = window_started_at(NOW - WINDOW_DURATION_MS * 2);
        let mut timer = CountdownTimer::new();
        assert_eq!(timer.tick(&window, at(NOW)).unwrap(), Tick::Expired);
        assert_eq!(timer.tick(&window, at(NOW)).unwrap(), Tick::Hidden);
    }
}
