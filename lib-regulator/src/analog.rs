//! Analog front end interface: the ports the core reads samples from and
//! drives actuators through, plus the raw <-> voltage conversion.

use crate::math::range::Range;
use crate::{ConfigError, CHANNEL_COUNT, OUTPUT_COUNT};

/// Reference calibrated peak-to-peak range of the front end.
pub const FULL_SCALE_VOLTS_DEFAULT: f32 = 20.0;

const RAW_SPAN: Range<f32> = Range::new(i16::MIN as f32, -(i16::MIN as f32));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogError {
    Timeout,
    InvalidChannel,
}

/// A monitored input channel, always below `CHANNEL_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelId(u8);

impl ChannelId {
    pub const fn new(channel: u8) -> Result<Self, ConfigError> {
        if (channel as usize) < CHANNEL_COUNT {
            Ok(Self(channel))
        } else {
            Err(ConfigError::InvalidChannel)
        }
    }

    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    pub const fn number(&self) -> u8 {
        self.0
    }

    /// Every channel, in index order.
    pub const fn all_array() -> [ChannelId; CHANNEL_COUNT] {
        let mut ids = [ChannelId(0); CHANNEL_COUNT];
        let mut i = 0;
        while i < CHANNEL_COUNT {
            ids[i] = ChannelId(i as u8);
            i += 1;
        }
        ids
    }

    pub fn all() -> impl Iterator<Item = ChannelId> {
        Self::all_array().into_iter()
    }
}

/// An actuator output channel, always below `OUTPUT_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputChannel(u8);

impl OutputChannel {
    pub const fn new(channel: u8) -> Result<Self, ConfigError> {
        if (channel as usize) < OUTPUT_COUNT {
            Ok(Self(channel))
        } else {
            Err(ConfigError::InvalidOutputChannel)
        }
    }

    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Sampling side of the analog port.
pub trait AnalogInput {
    fn read(&mut self, channel: ChannelId) -> Result<i16, AnalogError>;
}

/// Actuation side of the analog port.
pub trait AnalogOutput {
    fn write(&mut self, channel: OutputChannel, raw: i16) -> Result<(), AnalogError>;
}

/// Signed raw to calibrated volts: `v = raw * full_scale / 65536`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogScale {
    pub full_scale_volts: f32,
}

impl AnalogScale {
    pub const fn new(full_scale_volts: f32) -> Self {
        Self { full_scale_volts }
    }

    fn volts_span(&self) -> Range<f32> {
        let half = self.full_scale_volts / 2.0;
        Range::new(-half, half)
    }

    pub fn raw_to_voltage(&self, raw: i16) -> f32 {
        RAW_SPAN.map_value_to_range(raw as f32, &self.volts_span())
    }

    /// Nearest raw code for `volts`, saturating at the ends of the range.
    pub fn voltage_to_raw(&self, volts: f32) -> i16 {
        let raw = libm::roundf(self.volts_span().map_value_to_range(volts, &RAW_SPAN));
        num_traits::clamp(raw, i16::MIN as f32, i16::MAX as f32) as i16
    }
}

impl Default for AnalogScale {
    fn default() -> Self {
        Self::new(FULL_SCALE_VOLTS_DEFAULT)
    }
}
