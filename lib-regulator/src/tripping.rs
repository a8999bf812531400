//! Trip curve integration and actuator latching.
//!
//! Every slow tick each alarmed channel advances its trip count by a step
//! taken from the active timing curve. A channel whose count reaches the
//! threshold drives the corrective actuator: over-voltage lowers, under-voltage
//! raises. Each persisted trip counter is bumped at most once between two idle
//! states.

use embassy_sync::mutex::Mutex;

use crate::{
    analog::{AnalogOutput, AnalogScale, ChannelId, OutputChannel},
    channel::{AlarmState, ChannelStatus},
    config::RegulatorConfig,
    state::{RegulatorMutex, TrippingPorts},
    storage::StorageError,
    timer::{TimerId, TimerPort},
    ConfigError, CHANNEL_COUNT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TimingMode {
    /// fixed step per tick
    Definite = 1,
    /// step grows with the deviation
    Inverse = 2,
}

impl TryFrom<u8> for TimingMode {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TimingMode::Definite),
            2 => Ok(TimingMode::Inverse),
            _ => Err(ConfigError::InvalidTimingMode),
        }
    }
}

impl From<TimingMode> for u8 {
    fn from(mode: TimingMode) -> u8 {
        mode as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TripDirection {
    Raise,
    Lower,
}

impl TripDirection {
    pub fn for_alarm(alarm: AlarmState) -> Option<TripDirection> {
        match alarm {
            AlarmState::Normal => None,
            AlarmState::OverVoltage => Some(TripDirection::Lower),
            AlarmState::UnderVoltage => Some(TripDirection::Raise),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TripCurveParameters {
    pub tick_rate_hz: u32,
    pub trip_threshold: u32,
    pub definite_step: u32,
    pub inverse_numerator: f32,
    pub inverse_scale: f32,
    pub inverse_multiplier: f32,
    pub min_step: u32,
    pub max_step: u32,
    /// level driven on an asserted actuator
    pub excitation_volts: f32,
}

impl TripCurveParameters {
    /// Trip count increment for one tick at the given deviation.
    ///
    /// The inverse curve is `numerator / (scale / deviation * multiplier)`,
    /// rounded and clamped to `[min_step, max_step]`. A non-positive deviation
    /// takes the minimum step.
    pub fn step(&self, mode: TimingMode, deviation: f32) -> u32 {
        match mode {
            TimingMode::Definite => self.definite_step,
            TimingMode::Inverse => {
                if deviation.is_nan() || deviation <= 0.0 {
                    return self.min_step;
                }

                let trip_time = self.inverse_scale / deviation * self.inverse_multiplier;
                let step = libm::roundf(self.inverse_numerator / trip_time);
                num_traits::clamp(step, self.min_step as f32, self.max_step as f32) as u32
            }
        }
    }
}

/// Actuator output assignment. The three roles never share an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorMap {
    raise: OutputChannel,
    lower: OutputChannel,
    alarm: OutputChannel,
}

impl ActuatorMap {
    pub const fn new(raise: u8, lower: u8, alarm: u8) -> Result<Self, ConfigError> {
        if raise == lower || raise == alarm || lower == alarm {
            return Err(ConfigError::InvalidOutputChannel);
        }

        let raise = match OutputChannel::new(raise) {
            Ok(c) => c,
            Err(e) => return Err(e),
        };
        let lower = match OutputChannel::new(lower) {
            Ok(c) => c,
            Err(e) => return Err(e),
        };
        let alarm = match OutputChannel::new(alarm) {
            Ok(c) => c,
            Err(e) => return Err(e),
        };

        Ok(Self { raise, lower, alarm })
    }

    pub fn raise(&self) -> OutputChannel {
        self.raise
    }

    pub fn lower(&self) -> OutputChannel {
        self.lower
    }

    pub fn alarm(&self) -> OutputChannel {
        self.alarm
    }

    pub fn for_direction(&self, direction: TripDirection) -> OutputChannel {
        match direction {
            TripDirection::Raise => self.raise,
            TripDirection::Lower => self.lower,
        }
    }
}

/// What the tripping worker needs from persisted settings.
pub trait TripSettings {
    fn timing_mode(&self) -> TimingMode;

    /// Returns the new counter value.
    fn record_trip(&mut self, direction: TripDirection) -> Result<u8, StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrippingLatch {
    pub raise_active: bool,
    pub lower_active: bool,
    pub alarm_active: bool,
    /// a trip has been counted since the last return to idle
    pub episode_triggered: bool,
}

impl TrippingLatch {
    pub const IDLE: TrippingLatch = TrippingLatch {
        raise_active: false,
        lower_active: false,
        alarm_active: false,
        episode_triggered: false,
    };

    fn active(&self, direction: TripDirection) -> bool {
        match direction {
            TripDirection::Raise => self.raise_active,
            TripDirection::Lower => self.lower_active,
        }
    }

    fn set_active(&mut self, direction: TripDirection, active: bool) {
        match direction {
            TripDirection::Raise => self.raise_active = active,
            TripDirection::Lower => self.lower_active = active,
        }
    }

    pub fn is_idle(&self) -> bool {
        !(self.raise_active || self.lower_active || self.alarm_active)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TripTracker {
    trip_count: u32,
    episode: u32,
}

pub struct TrippingTimer<'a, O: AnalogOutput> {
    ports: TrippingPorts<'a>,
    output: O,
    curve: TripCurveParameters,
    actuators: ActuatorMap,
    scale: AnalogScale,
    trackers: [TripTracker; CHANNEL_COUNT],
    latch: TrippingLatch,
    /// direction already counted since the last idle
    counted: Option<TripDirection>,
}

impl<'a, O: AnalogOutput> TrippingTimer<'a, O> {
    pub fn new(ports: TrippingPorts<'a>, output: O, config: &RegulatorConfig) -> Self {
        Self {
            ports,
            output,
            curve: config.trip_curve,
            actuators: config.actuators,
            scale: config.scale,
            trackers: [TripTracker::default(); CHANNEL_COUNT],
            latch: TrippingLatch::IDLE,
            counted: None,
        }
    }

    pub fn latch(&self) -> TrippingLatch {
        self.latch
    }

    pub fn trip_count(&self, channel: ChannelId) -> u32 {
        self.trackers[channel.index()].trip_count
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// One slow tick: integrate, latch, actuate, and drop back to idle when
    /// everything has cleared.
    pub fn tick<S: TripSettings, T: TimerPort>(&mut self, settings: &mut S, timer: &T) -> TrippingLatch {
        let mode = settings.timing_mode();
        let threshold = self.curve.trip_threshold;

        let mut any_alarm = false;
        let mut raise_due = false;
        let mut lower_due = false;

        for (tracker, cell) in self.trackers.iter_mut().zip(self.ports.channels.iter()) {
            let ChannelStatus { reading, episode } = cell.get();

            if !reading.alarm.is_alarmed() || episode != tracker.episode {
                tracker.trip_count = 0;
                tracker.episode = episode;
            }

            let Some(direction) = TripDirection::for_alarm(reading.alarm) else {
                continue;
            };
            any_alarm = true;

            let step = self.curve.step(mode, reading.deviation);
            tracker.trip_count = tracker.trip_count.saturating_add(step).min(threshold);

            if tracker.trip_count >= threshold {
                match direction {
                    TripDirection::Raise => raise_due = true,
                    TripDirection::Lower => lower_due = true,
                }
            }
        }

        if any_alarm != self.latch.alarm_active {
            self.latch.alarm_active = any_alarm;
            let alarm = self.actuators.alarm();
            self.drive(alarm, any_alarm);
        }

        for (direction, due) in [(TripDirection::Lower, lower_due), (TripDirection::Raise, raise_due)] {
            if due == self.latch.active(direction) {
                continue;
            }

            self.latch.set_active(direction, due);
            let output = self.actuators.for_direction(direction);
            self.drive(output, due);

            if due {
                warn!("trip asserted: {:?}", direction);
                self.count_trip(settings, direction);
            } else {
                info!("trip released: {:?}", direction);
            }
        }

        if !any_alarm && self.latch.is_idle() {
            self.go_idle(timer);
        }

        self.ports.latch.publish(self.latch);
        self.latch
    }

    /// Waits for slow ticks forever. Settings are locked only for the
    /// duration of one tick.
    pub async fn run<S: TripSettings, T: TimerPort>(&mut self, settings: &Mutex<RegulatorMutex, S>, timer: &T) -> ! {
        loop {
            self.ports.tick.acquire().await;
            let mut settings = settings.lock().await;
            self.tick(&mut *settings, timer);
        }
    }

    fn count_trip<S: TripSettings>(&mut self, settings: &mut S, direction: TripDirection) {
        if self.counted == Some(direction) {
            return;
        }

        match settings.record_trip(direction) {
            Ok(count) => debug!("{:?} trips: {}", direction, count),
            Err(e) => error!("failed to persist {:?} trip: {:?}", direction, e),
        }

        self.counted = Some(direction);
        self.latch.episode_triggered = true;
    }

    fn go_idle<T: TimerPort>(&mut self, timer: &T) {
        timer.enable(TimerId::Tripping, false);

        if self.latch.episode_triggered {
            debug!("all channels normal, trip episode closed");
        }
        self.latch = TrippingLatch::IDLE;
        self.counted = None;

        let neutral = [self.actuators.raise(), self.actuators.lower(), self.actuators.alarm()];
        for output in neutral {
            self.drive(output, false);
        }
    }

    fn drive(&mut self, output: OutputChannel, active: bool) {
        let raw = if active {
            self.scale.voltage_to_raw(self.curve.excitation_volts)
        } else {
            0
        };

        if let Err(e) = self.output.write(output, raw) {
            error!("actuator {} write failed: {:?}", output.index(), e);
        }
    }
}
