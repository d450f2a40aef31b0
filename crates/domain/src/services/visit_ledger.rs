//! Per-marker visit debounce.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::models::Marker;

/// Default minimum time between two notifications for the same marker.
pub const DEFAULT_VISIT_COOLDOWN_SECS: i64 = 60;

/// Remembers when each marker was last reported as newly entered.
///
/// The ledger is keyed purely by time since the last report: leaving and
/// re-entering a zone within the cooldown does not produce a new report.
#[derive(Debug, Clone)]
pub struct VisitLedger {
    cooldown: Duration,
    visits: HashMap<i64, DateTime<Utc>>,
}

impl VisitLedger {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            visits: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Filters the in-zone markers down to those never reported or whose
    /// last report is older than the cooldown, stamping each of them with
    /// `now`. Markers still cooling down are dropped untouched.
    pub fn filter_new<'a>(&mut self, in_zone: &[&'a Marker], now: DateTime<Utc>) -> Vec<&'a Marker> {
        let mut fresh = Vec::new();

        for marker in in_zone {
            let is_new = match self.visits.get(&marker.id) {
                None => true,
                Some(last) => now - *last > self.cooldown,
            };

            if is_new {
                self.visits.insert(marker.id, now);
                fresh.push(*marker);
            }
        }

        fresh
    }

    /// Last time the marker was reported, if ever.
    pub fn last_visit(&self, marker_id: i64) -> Option<DateTime<Utc>> {
        self.visits.get(&marker_id).copied()
    }

    /// Drop the entry of a deleted marker. Returns true if one existed.
    pub fn forget(&mut self, marker_id: i64) -> bool {
        self.visits.remove(&marker_id).is_some()
    }

    /// Drop entries for markers absent from the snapshot. Returns the
    /// number of removed entries.
    pub fn retain_markers(&mut self, markers: &[Marker]) -> usize {
        let known: HashSet<i64> = markers.iter().map(|m| m.id).collect();
        let before = self.visits.len();
        self.visits.retain(|id, _| known.contains(id));
        before - self.visits.len()
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}

impl Default for VisitLedger {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_VISIT_COOLDOWN_SECS))
    }
}
