use std::{
    collections::{HashMap, VecDeque},
    sync::OnceLock,
    time::{Duration, Instant},
};

use regex::Regex;

use crate::domain::{ChatId, UserId};

// ============== Anti-link ==============

pub fn link_detected(text: &str) -> bool {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    LINK_RE
        .get_or_init(|| Regex::new(r"(?i)\b(?:t|telegram)\.me/").expect("valid regex"))
        .is_match(text)
}

// ============== Activity Tracker (slow mode + spam) ==============

pub type ActivityKey = (ChatId, UserId);

#[derive(Clone, Debug)]
struct Activity {
    last: Instant,
    recent: VecDeque<Instant>,
    /// Slow-mode interval in force when `last` was recorded.
    slow_mode: Duration,
}

/// Per-(chat, user) message timestamps for slow mode and the spam window.
#[derive(Debug, Default)]
pub struct ActivityTracker {
    entries: HashMap<ActivityKey, Activity>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the remaining wait if the user posted less than `interval` ago.
    pub fn check_slow_mode_at(
        &self,
        key: ActivityKey,
        interval: Duration,
        now: Instant,
    ) -> Option<Duration> {
        if interval.is_zero() {
            return None;
        }
        let last = self.entries.get(&key)?.last;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < interval).then(|| interval - elapsed)
    }

    /// Record an accepted message; returns how many messages fall inside `window`.
    ///
    /// `slow_mode` is the chat's current interval; the entry outlives the idle
    /// sweep until that interval has passed.
    pub fn record_at(
        &mut self,
        key: ActivityKey,
        window: Duration,
        slow_mode: Duration,
        now: Instant,
    ) -> usize {
        let entry = self.entries.entry(key).or_insert_with(|| Activity {
            last: now,
            recent: VecDeque::new(),
            slow_mode,
        });

        while let Some(&oldest) = entry.recent.front() {
            if now.saturating_duration_since(oldest) >= window {
                entry.recent.pop_front();
            } else {
                break;
            }
        }
        entry.recent.push_back(now);
        entry.last = now;
        entry.slow_mode = slow_mode;
        entry.recent.len()
    }

    pub fn reset(&mut self, key: ActivityKey) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.recent.clear();
        }
    }

    /// Drop users idle for longer than `idle_ttl` whose slow-mode interval has
    /// also run out; returns how many were removed.
    pub fn sweep_at(&mut self, now: Instant, idle_ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, a| now.saturating_duration_since(a.last) < idle_ttl.max(a.slow_mode));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
