//! Telemetry records handed to the transport collaborator
//!
//! The core produces structured records and nothing else. Encoding and
//! transport belong to the sink; with the `serde` feature every record is
//! `Serialize`, so a host sink can write JSON lines and an MCU sink can
//! pick a compact format.

use heapless::Deque;

use crate::control::ControlDecision;
use crate::sensor::SensorVector;
use crate::time::Timestamp;
use crate::twin::TwinForecast;

/// What a record carries
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "data", rename_all = "snake_case"))]
pub enum TelemetryPayload {
    /// Fused vector after a sampling stage
    Sensors(SensorVector),
    /// Controller decision after a control stage
    Decision(ControlDecision),
    /// Twin forecast after a sampling stage
    Forecast(TwinForecast),
}

/// One timestamped record
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TelemetryRecord {
    /// Time the record was produced
    pub timestamp: Timestamp,
    /// Record body
    pub payload: TelemetryPayload,
}

impl TelemetryRecord {
    /// Sensor record
    pub fn sensors(timestamp: Timestamp, vector: SensorVector) -> Self {
        Self {
            timestamp,
            payload: TelemetryPayload::Sensors(vector),
        }
    }

    /// Decision record
    pub fn decision(timestamp: Timestamp, decision: ControlDecision) -> Self {
        Self {
            timestamp,
            payload: TelemetryPayload::Decision(decision),
        }
    }

    /// Forecast record
    pub fn forecast(timestamp: Timestamp, forecast: TwinForecast) -> Self {
        Self {
            timestamp,
            payload: TelemetryPayload::Forecast(forecast),
        }
    }
}

/// Receiver of telemetry records
///
/// Called from the control loop, so implementations must not block.
pub trait TelemetrySink {
    /// Deliver one record
    fn publish(&mut self, record: &TelemetryRecord);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn publish(&mut self, _record: &TelemetryRecord) {}
}

/// Keeps the `N` most recent records in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink<const N: usize> {
    records: Deque<TelemetryRecord, N>,
    dropped: u32,
}

impl<const N: usize> MemorySink<N> {
    /// Empty sink
    pub fn new() -> Self {
        Self {
            records: Deque::new(),
            dropped: 0,
        }
    }

    /// Records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is held
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records evicted to make room
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.records.iter()
    }

    /// Remove and return the oldest record
    pub fn pop(&mut self) -> Option<TelemetryRecord> {
        self.records.pop_front()
    }

    /// Drop every held record
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl<const N: usize> TelemetrySink for MemorySink<N> {
    fn publish(&mut self, record: &TelemetryRecord) {
        if self.records.is_full() {
            self.records.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
        // Cannot fail after the eviction above; N == 0 keeps nothing
        let _ = self.records.push_back(*record);
    }
}
