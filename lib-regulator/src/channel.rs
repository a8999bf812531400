use crate::{
    analog::{AnalogScale, ChannelId},
    config::RegulatorConfig,
    math::rms,
    state::MonitorPorts,
    timer::{TimerId, TimerPort},
    window::SampleWindow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmState {
    Normal,
    OverVoltage,
    UnderVoltage,
}

impl AlarmState {
    pub fn is_alarmed(&self) -> bool {
        *self != AlarmState::Normal
    }
}

/// RMS band a channel is considered healthy in. Both limits are strict, a
/// value sitting exactly on a limit is still Normal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThresholdParameters {
    pub low_volts: f32,
    pub high_volts: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelReading {
    pub rms: f32,
    pub alarm: AlarmState,
    /// distance outside the band, zero while Normal
    pub deviation: f32,
}

impl ChannelReading {
    pub const NORMAL: ChannelReading = ChannelReading {
        rms: 0.0,
        alarm: AlarmState::Normal,
        deviation: 0.0,
    };

    pub fn classify(rms: f32, thresholds: &ThresholdParameters) -> Self {
        let (alarm, deviation) = if rms > thresholds.high_volts {
            (AlarmState::OverVoltage, rms - thresholds.high_volts)
        } else if rms < thresholds.low_volts {
            (AlarmState::UnderVoltage, thresholds.low_volts - rms)
        } else {
            (AlarmState::Normal, 0.0)
        };

        Self { rms, alarm, deviation }
    }
}

/// Published per channel after every window. `episode` advances whenever a
/// new alarm condition starts (Normal to alarm, or a direct swing between
/// over and under voltage) so the tripping side can tell a fresh alarm from a
/// continuing one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelStatus {
    pub reading: ChannelReading,
    pub episode: u32,
}

impl ChannelStatus {
    pub const NORMAL: ChannelStatus = ChannelStatus {
        reading: ChannelReading::NORMAL,
        episode: 0,
    };
}

pub struct ChannelMonitor<'a> {
    ports: MonitorPorts<'a>,
    scale: AnalogScale,
    thresholds: ThresholdParameters,
}

impl<'a> ChannelMonitor<'a> {
    pub fn new(ports: MonitorPorts<'a>, config: &RegulatorConfig) -> Self {
        Self {
            ports,
            scale: config.scale,
            thresholds: config.thresholds,
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.ports.channel
    }

    /// Classify one complete window and publish the result.
    pub fn process(&mut self, window: &SampleWindow) -> ChannelStatus {
        let previous = self.ports.status.current();
        let rms = rms(window.voltages(&self.scale));
        let reading = ChannelReading::classify(rms, &self.thresholds);

        // entering an alarm, or flipping straight to the opposite one
        let mut episode = previous.episode;
        if reading.alarm.is_alarmed() && reading.alarm != previous.reading.alarm {
            episode = episode.wrapping_add(1);
        }

        if previous.reading.alarm != reading.alarm {
            info!(
                "channel {} {:?} -> {:?}, rms {}",
                self.ports.channel.number(),
                previous.reading.alarm,
                reading.alarm,
                rms
            );
        }

        let status = ChannelStatus { reading, episode };
        self.ports.status.publish(status);
        status
    }

    /// Suspends until the scheduler hands over the next window. An alarmed
    /// result arms the slow timer, a timer that is already running keeps its
    /// phase.
    pub async fn next_cycle<T: TimerPort>(&mut self, timer: &T) -> ChannelStatus {
        let window = self.ports.window.wait().await;
        let status = self.process(&window);

        if status.reading.alarm.is_alarmed() {
            timer.enable(TimerId::Tripping, true);
        }
        status
    }

    pub async fn run<T: TimerPort>(&mut self, timer: &T) -> ! {
        loop {
            self.next_cycle(timer).await;
        }
    }
}
