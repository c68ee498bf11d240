//! Sensor data model
//!
//! The reactor samples five analog channels per tick. [`RawFrame`] is what
//! the sampling collaborator hands over, [`SensorVector`] is the fused,
//! physical-unit snapshot every downstream component reads.

use crate::constants::sensors::CHANNEL_COUNT;
use crate::errors::{ReactorError, ReactorResult};
use crate::time::Timestamp;

/// One of the five reactor sensor channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    /// Flow velocity, cm/s
    Flow,
    /// Pollutant concentration, ppm
    Pollutant,
    /// Light intensity, lux
    Light,
    /// pH
    Ph,
    /// Water temperature, °C
    Temperature,
}

impl Channel {
    /// All channels in vector order
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Flow,
        Channel::Pollutant,
        Channel::Light,
        Channel::Ph,
        Channel::Temperature,
    ];

    /// Position in the sensor vector
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Checked conversion from a vector position
    pub fn from_index(index: usize) -> ReactorResult<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(ReactorError::ChannelOutOfRange { index })
    }

    /// Lowercase channel name for logs
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Flow => "flow",
            Channel::Pollutant => "pollutant",
            Channel::Light => "light",
            Channel::Ph => "ph",
            Channel::Temperature => "temperature",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Channel {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.name())
    }
}

/// Raw samples for one tick, in ADC counts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawFrame(pub [f32; CHANNEL_COUNT]);

impl RawFrame {
    /// Frame from raw counts in `Channel` order
    pub const fn new(samples: [f32; CHANNEL_COUNT]) -> Self {
        Self(samples)
    }

    /// Raw counts of one channel
    pub fn get(&self, channel: Channel) -> f32 {
        self.0[channel.index()]
    }

    /// Overwrite one channel's raw counts
    pub fn set(&mut self, channel: Channel, raw: f32) {
        self.0[channel.index()] = raw;
    }

    /// True when every sample is a finite number
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

/// Fused snapshot of the reactor for one sampling tick
///
/// Values are in physical units. A faulty channel carries the compensated
/// estimate and a quality of 0.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorVector {
    /// Physical value per channel, in `Channel` order
    pub values: [f32; CHANNEL_COUNT],
    /// Fault flag per channel
    pub faults: [bool; CHANNEL_COUNT],
    /// Per-channel quality in [0, 1]
    pub quality: [f32; CHANNEL_COUNT],
    /// Energy usage, percent
    pub energy_usage: f32,
    /// Pollutant removal efficiency, percent
    pub efficiency: f32,
    /// Time the frame was sampled
    pub timestamp: Timestamp,
}

impl Default for SensorVector {
    fn default() -> Self {
        Self {
            values: [0.0; CHANNEL_COUNT],
            faults: [false; CHANNEL_COUNT],
            quality: [0.0; CHANNEL_COUNT],
            energy_usage: 0.0,
            efficiency: 0.0,
            timestamp: 0,
        }
    }
}

impl SensorVector {
    /// Fault-free vector with full quality, mostly useful in tests and sims
    pub fn from_values(values: [f32; CHANNEL_COUNT], timestamp: Timestamp) -> Self {
        Self {
            values,
            quality: [1.0; CHANNEL_COUNT],
            timestamp,
            ..Self::default()
        }
    }

    /// Attach derived energy usage and efficiency
    pub fn with_plant(mut self, energy_usage: f32, efficiency: f32) -> Self {
        self.energy_usage = energy_usage;
        self.efficiency = efficiency;
        self
    }

    /// Physical value of one channel
    pub fn get(&self, channel: Channel) -> f32 {
        self.values[channel.index()]
    }

    /// Overwrite one channel's value
    pub fn set(&mut self, channel: Channel, value: f32) {
        self.values[channel.index()] = value;
    }

    /// Flow, cm/s
    pub fn flow(&self) -> f32 {
        self.get(Channel::Flow)
    }

    /// Pollutant, ppm
    pub fn pollutant(&self) -> f32 {
        self.get(Channel::Pollutant)
    }

    /// Light, lux
    pub fn light(&self) -> f32 {
        self.get(Channel::Light)
    }

    /// pH
    pub fn ph(&self) -> f32 {
        self.get(Channel::Ph)
    }

    /// Temperature, °C
    pub fn temperature(&self) -> f32 {
        self.get(Channel::Temperature)
    }

    /// True when the channel's fault flag is set
    pub fn is_faulty(&self, channel: Channel) -> bool {
        self.faults[channel.index()]
    }

    /// Set or clear a channel's fault flag
    pub fn set_fault(&mut self, channel: Channel, faulty: bool) {
        self.faults[channel.index()] = faulty;
    }

    /// Quality of one channel in [0, 1]
    pub fn quality(&self, channel: Channel) -> f32 {
        self.quality[channel.index()]
    }

    /// Number of faulty channels
    pub fn fault_count(&self) -> usize {
        self.faults.iter().filter(|&&f| f).count()
    }

    /// Channels without a fault flag
    pub fn working_sensor_count(&self) -> usize {
        CHANNEL_COUNT - self.fault_count()
    }

    /// Mean of the other four channels' values
    pub fn mean_excluding(&self, channel: Channel) -> f32 {
        let sum: f32 = Channel::ALL
            .iter()
            .filter(|&&c| c != channel)
            .map(|&c| self.get(c))
            .sum();
        sum / (CHANNEL_COUNT - 1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_index_round_trip() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
            assert_eq!(Channel::from_index(i), Ok(*channel));
        }
        assert_eq!(
            Channel::from_index(5),
            Err(ReactorError::ChannelOutOfRange { index: 5 })
        );
    }

    #[test]
    fn working_count_tracks_faults() {
        let mut vector = SensorVector::from_values([10.0, 200.0, 500.0, 7.0, 25.0], 0);
        assert_eq!(vector.working_sensor_count(), 5);

        vector.set_fault(Channel::Ph, true);
        vector.set_fault(Channel::Light, true);
        assert_eq!(vector.fault_count(), 2);
        assert_eq!(vector.working_sensor_count(), 3);
    }

    #[test]
    fn mean_excluding_skips_channel() {
        let vector = SensorVector::from_values([10.0, 1000.0, 20.0, 30.0, 40.0], 0);
        assert_eq!(vector.mean_excluding(Channel::Pollutant), 25.0);
    }

    #[test]
    fn raw_frame_rejects_nan() {
        let mut frame = RawFrame::new([512.0; CHANNEL_COUNT]);
        assert!(frame.is_finite());
        frame.set(Channel::Light, f32::NAN);
        assert!(!frame.is_finite());
    }
}
