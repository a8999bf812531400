//! Timer port: two independent periodic tick sources.

pub const NANOS_PER_SECOND: u32 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerId {
    /// fast timer, one tick per sample slot
    Sampling,
    /// slow timer driving the trip curve
    Tripping,
}

impl TimerId {
    pub const fn index(&self) -> usize {
        match self {
            TimerId::Sampling => 0,
            TimerId::Tripping => 1,
        }
    }
}

/// Each tick of a timer releases the matching `TickSignal` held by the
/// regulator state. Implementations must be callable from any task, hence
/// `&self`.
pub trait TimerPort {
    /// Reload the period. With `restart` the running count is discarded so the
    /// next tick lands one full new period from now.
    fn set_period(&self, timer: TimerId, period_ns: u32, restart: bool);

    /// Enabling an already running timer does not disturb its phase.
    fn enable(&self, timer: TimerId, enable: bool);
}

pub const fn period_ns_from_hz(rate_hz: u32) -> u32 {
    NANOS_PER_SECOND / rate_hz
}
