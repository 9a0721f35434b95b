//! Rolling log of `/predict` calls for the admin view.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use conductivity_core::{ComplianceStatus, Fractions};
use serde::{Deserialize, Serialize};

/// One `/predict` call as kept in the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub fractions: Fractions,
    pub prediction: RecordedPrediction,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedPrediction {
    pub lambda_predicted: f64,
    pub confidence_interval: f64,
    pub status: ComplianceStatus,
    pub threshold_used: f64,
}

/// Keeps the most recent `capacity` records; older ones are dropped.
#[derive(Debug)]
pub struct MeasurementHistory {
    records: VecDeque<MeasurementRecord>,
    capacity: usize,
    total_recorded: u64,
}

impl MeasurementHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            total_recorded: 0,
        }
    }

    pub fn push(&mut self, record: MeasurementRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
        self.total_recorded += 1;
    }

    /// Up to `limit` most recent records, oldest first.
    pub fn latest(&self, limit: usize) -> Vec<MeasurementRecord> {
        let skip = self.records.len().saturating_sub(limit);
        self.records.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records ever pushed, dropped ones included.
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }
}
