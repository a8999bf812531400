#![cfg_attr(not(test), no_std)]

// must come first so the logging macros are visible to every module
mod fmt;

pub mod analog;
pub mod channel;
pub mod command;
pub mod config;
pub mod frequency;
pub mod math;
pub mod scheduler;
pub mod spectrum;
pub mod state;
pub mod storage;
pub mod sync;
pub mod timer;
pub mod tripping;
pub mod window;

pub use analog::{AnalogError, AnalogInput, AnalogOutput, AnalogScale, ChannelId, OutputChannel};
pub use channel::{AlarmState, ChannelMonitor, ChannelReading, ChannelStatus};
pub use config::{RegulatorConfig, DEFAULT_CONFIG};
pub use frequency::LineFrequency;
pub use scheduler::SampleScheduler;
pub use state::{RegulatorParts, RegulatorState, Telemetry};
pub use storage::{PersistentSettings, StorageError, StoragePort};
pub use timer::{TimerId, TimerPort};
pub use tripping::{TimingMode, TrippingLatch, TrippingTimer};

/// Monitored analog inputs.
pub const CHANNEL_COUNT: usize = 3;

/// Actuator outputs: raise, lower and alarm.
pub const OUTPUT_COUNT: usize = 3;

/// Samples per line cycle.
pub const WINDOW_SIZE: usize = 16;

/// A parameter outside its valid range, rejected before it reaches the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    InvalidChannel,
    InvalidHarmonic,
    InvalidTimingMode,
    InvalidOutputChannel,
}
