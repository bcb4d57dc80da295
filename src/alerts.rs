// Alert governor: per-key cooldown and a bounded most-recent-first alert log

use crate::models::{AlertEvent, AlertKey, Severity};
use std::collections::{HashMap, VecDeque};

pub struct AlertGovernor {
    cooldown_secs: f64,
    capacity: usize,
    last_fired: HashMap<AlertKey, f64>,
    log: VecDeque<AlertEvent>,
}

impl AlertGovernor {
    pub fn new(cooldown_secs: u64, capacity: usize) -> Self {
        Self {
            cooldown_secs: cooldown_secs as f64,
            capacity,
            last_fired: HashMap::new(),
            log: VecDeque::with_capacity(capacity),
        }
    }

    /// Returns the surfaced event, or `None` while `key` is cooling down.
    /// `now` is the tick timestamp, so events and audit rows of one tick agree.
    /// A suppressed call leaves both the log and the cooldown timer untouched.
    pub fn consider(
        &mut self,
        key: AlertKey,
        now: f64,
        severity: Severity,
        value: f64,
        message: impl Into<String>,
    ) -> Option<AlertEvent> {
        if let Some(&last) = self.last_fired.get(&key)
            && now - last < self.cooldown_secs
        {
            return None;
        }
        self.last_fired.insert(key, now);
        let event = AlertEvent {
            key,
            severity,
            value,
            message: message.into(),
            first_fired_at: now,
        };
        if self.capacity > 0 {
            if self.log.len() == self.capacity {
                self.log.pop_back();
            }
            self.log.push_front(event.clone());
        }
        tracing::info!(key = %key, severity = %severity, message = %event.message, "alert surfaced");
        Some(event)
    }

    /// Most recent first.
    pub fn log(&self) -> impl Iterator<Item = &AlertEvent> {
        self.log.iter()
    }

    pub fn log_snapshot(&self) -> Vec<AlertEvent> {
        self.log.iter().cloned().collect()
    }

    pub fn last_fired(&self, key: &AlertKey) -> Option<f64> {
        self.last_fired.get(key).copied()
    }
}
