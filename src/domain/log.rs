//! Bounded, in-memory history of consultations.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;

use super::{ConsultationRecord, ConsultationStatus};

pub const MAX_LOG_ENTRIES: usize = 100;

/// FIFO log capped at [`MAX_LOG_ENTRIES`]; the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct ConsultationLog {
    entries: VecDeque<ConsultationRecord>,
    capacity: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogSnapshot {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub last_timestamp: Option<DateTime<Local>>,
}

impl Default for ConsultationLog {
    fn default() -> Self {
        Self::with_capacity(MAX_LOG_ENTRIES)
    }
}

impl ConsultationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(MAX_LOG_ENTRIES)),
            capacity,
        }
    }

    pub fn append(&mut self, record: ConsultationRecord) {
        self.entries.push_back(record);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Counts are recomputed from the current entries on every call.
    pub fn snapshot(&self) -> LogSnapshot {
        let successful = self
            .entries
            .iter()
            .filter(|r| r.status == ConsultationStatus::Success)
            .count();
        let failed = self
            .entries
            .iter()
            .filter(|r| r.status == ConsultationStatus::Error)
            .count();
        LogSnapshot {
            total: self.entries.len(),
            successful,
            failed,
            last_timestamp: self.entries.back().map(|r| r.timestamp),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConsultationRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
