//! Fast tick worker: fills the per-channel windows one slot per tick and
//! keeps the sampling clock locked to the line.

use crate::{
    analog::{AnalogInput, ChannelId},
    config::RegulatorConfig,
    frequency::FrequencyTracker,
    state::SchedulerPorts,
    timer::{TimerId, TimerPort},
    window::SampleWindow,
    CHANNEL_COUNT, WINDOW_SIZE,
};

pub struct SampleScheduler<'a, A: AnalogInput> {
    ports: SchedulerPorts<'a>,
    input: A,
    windows: [SampleWindow; CHANNEL_COUNT],
    position: usize,
    reference: ChannelId,
    tracker: FrequencyTracker,
}

impl<'a, A: AnalogInput> SampleScheduler<'a, A> {
    pub fn new(ports: SchedulerPorts<'a>, input: A, config: &RegulatorConfig) -> Self {
        Self {
            ports,
            input,
            windows: [SampleWindow::EMPTY; CHANNEL_COUNT],
            position: 0,
            reference: config.reference_channel,
            tracker: FrequencyTracker::new(config.frequency),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Programs the fast timer with the current interval and starts it.
    pub fn start<T: TimerPort>(&mut self, timer: &T) {
        let line = self.tracker.current();
        self.ports.frequency.publish(line);
        timer.set_period(TimerId::Sampling, line.sampling_interval_ns, true);
        timer.enable(TimerId::Sampling, true);
        info!("sampling at {} ns", line.sampling_interval_ns);
    }

    /// One sample slot for every channel. Returns true when this slot
    /// completed a window and the monitors were handed their copies.
    pub fn tick<T: TimerPort>(&mut self, timer: &T) -> bool {
        let position = self.position;

        for channel in ChannelId::all() {
            let raw = match self.input.read(channel) {
                Ok(raw) => raw,
                Err(e) => {
                    // slot keeps last cycle's value
                    trace!("channel {} read failed: {:?}", channel.number(), e);
                    if channel == self.reference {
                        self.tracker.skip();
                    }
                    continue;
                }
            };
            self.windows[channel.index()].set(position, raw);

            if channel == self.reference {
                self.track(raw, timer);
            }
        }

        self.position = (position + 1) % WINDOW_SIZE;
        if self.position != 0 {
            return false;
        }

        for (publisher, window) in self.ports.windows.iter_mut().zip(self.windows.iter()) {
            publisher.publish(*window);
        }
        self.ports.reference.publish(self.windows[self.reference.index()]);
        true
    }

    pub async fn run<T: TimerPort>(&mut self, timer: &T) -> ! {
        loop {
            self.ports.tick.acquire().await;
            self.tick(timer);
        }
    }

    fn track<T: TimerPort>(&mut self, sample: i16, timer: &T) {
        let Some(line) = self.tracker.push(sample) else {
            return;
        };

        timer.set_period(TimerId::Sampling, line.sampling_interval_ns, true);
        self.ports.frequency.publish(line);
        debug!("line {} Hz, sampling every {} ns", line.frequency_hz, line.sampling_interval_ns);
    }
}
