//! Shared regulator state and the handles that partition access to it.
//!
//! Every piece of shared state has exactly one writer. `RegulatorState::split`
//! hands the writer side of each cell to the worker that owns it, once, and
//! readers only ever receive copies.

use core::{
    cell::Cell,
    sync::atomic::{AtomicBool, Ordering},
};

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    signal::Signal,
};

use crate::{
    analog::{AnalogScale, ChannelId},
    channel::{ChannelReading, ChannelStatus},
    frequency::LineFrequency,
    spectrum::SpectralAnalyzer,
    sync::TickSignal,
    tripping::TrippingLatch,
    window::SampleWindow,
    CHANNEL_COUNT,
};

pub type RegulatorMutex = CriticalSectionRawMutex;

pub type WindowSignal = Signal<RegulatorMutex, SampleWindow>;

/// Copy-in, copy-out cell. Reads never observe a partially written value.
pub struct SnapshotCell<T: Copy> {
    inner: Mutex<RegulatorMutex, Cell<T>>,
}

impl<T: Copy> SnapshotCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Cell::new(value)),
        }
    }

    pub fn get(&self) -> T {
        self.inner.lock(|cell| cell.get())
    }

    fn set(&self, value: T) {
        self.inner.lock(|cell| cell.set(value))
    }
}

/// The only way to write a `SnapshotCell` from outside this module.
pub struct SnapshotWriter<'a, T: Copy> {
    cell: &'a SnapshotCell<T>,
}

impl<'a, T: Copy> SnapshotWriter<'a, T> {
    pub fn publish(&mut self, value: T) {
        self.cell.set(value);
    }

    pub fn current(&self) -> T {
        self.cell.get()
    }
}

pub struct WindowPublisher<'a> {
    signal: &'a WindowSignal,
}

impl<'a> WindowPublisher<'a> {
    /// Replaces any window the monitor has not consumed yet.
    pub fn publish(&mut self, window: SampleWindow) {
        self.signal.signal(window);
    }
}

pub struct WindowReceiver<'a> {
    signal: &'a WindowSignal,
}

impl<'a> WindowReceiver<'a> {
    pub async fn wait(&mut self) -> SampleWindow {
        self.signal.wait().await
    }

    pub fn try_take(&mut self) -> Option<SampleWindow> {
        self.signal.try_take()
    }
}

pub struct RegulatorState {
    taken: AtomicBool,
    sampling_tick: TickSignal,
    tripping_tick: TickSignal,
    windows: [WindowSignal; CHANNEL_COUNT],
    reference_window: SnapshotCell<SampleWindow>,
    channels: [SnapshotCell<ChannelStatus>; CHANNEL_COUNT],
    frequency: SnapshotCell<LineFrequency>,
    latch: SnapshotCell<TrippingLatch>,
}

pub struct SchedulerPorts<'a> {
    pub tick: &'a TickSignal,
    pub windows: [WindowPublisher<'a>; CHANNEL_COUNT],
    pub reference: SnapshotWriter<'a, SampleWindow>,
    pub frequency: SnapshotWriter<'a, LineFrequency>,
}

pub struct MonitorPorts<'a> {
    pub channel: ChannelId,
    pub window: WindowReceiver<'a>,
    pub status: SnapshotWriter<'a, ChannelStatus>,
}

pub struct TrippingPorts<'a> {
    pub tick: &'a TickSignal,
    pub channels: &'a [SnapshotCell<ChannelStatus>; CHANNEL_COUNT],
    pub latch: SnapshotWriter<'a, TrippingLatch>,
}

pub struct RegulatorParts<'a> {
    pub scheduler: SchedulerPorts<'a>,
    pub monitors: [MonitorPorts<'a>; CHANNEL_COUNT],
    pub tripping: TrippingPorts<'a>,
    pub telemetry: Telemetry<'a>,
}

impl RegulatorState {
    pub fn new(initial_frequency: LineFrequency) -> Self {
        Self {
            taken: AtomicBool::new(false),
            sampling_tick: TickSignal::new(),
            tripping_tick: TickSignal::new(),
            windows: core::array::from_fn(|_| Signal::new()),
            reference_window: SnapshotCell::new(SampleWindow::EMPTY),
            channels: core::array::from_fn(|_| SnapshotCell::new(ChannelStatus::NORMAL)),
            frequency: SnapshotCell::new(initial_frequency),
            latch: SnapshotCell::new(TrippingLatch::IDLE),
        }
    }

    /// Tick sources release these from interrupt context.
    pub fn tick_signal(&self, timer: crate::timer::TimerId) -> &TickSignal {
        match timer {
            crate::timer::TimerId::Sampling => &self.sampling_tick,
            crate::timer::TimerId::Tripping => &self.tripping_tick,
        }
    }

    /// Hands out the writer handles. Returns `None` on every call after the
    /// first so no cell can gain a second writer.
    pub fn split(&self) -> Option<RegulatorParts<'_>> {
        if self.taken.swap(true, Ordering::AcqRel) {
            return None;
        }

        let ids = ChannelId::all_array();
        Some(RegulatorParts {
            scheduler: SchedulerPorts {
                tick: &self.sampling_tick,
                windows: core::array::from_fn(|i| WindowPublisher {
                    signal: &self.windows[i],
                }),
                reference: SnapshotWriter {
                    cell: &self.reference_window,
                },
                frequency: SnapshotWriter {
                    cell: &self.frequency,
                },
            },
            monitors: core::array::from_fn(|i| MonitorPorts {
                channel: ids[i],
                window: WindowReceiver {
                    signal: &self.windows[i],
                },
                status: SnapshotWriter {
                    cell: &self.channels[i],
                },
            }),
            tripping: TrippingPorts {
                tick: &self.tripping_tick,
                channels: &self.channels,
                latch: SnapshotWriter { cell: &self.latch },
            },
            telemetry: Telemetry { state: self },
        })
    }
}

/// Read-only view for the command surface and logging.
#[derive(Clone, Copy)]
pub struct Telemetry<'a> {
    state: &'a RegulatorState,
}

impl<'a> Telemetry<'a> {
    pub fn channel(&self, channel: ChannelId) -> ChannelReading {
        self.state.channels[channel.index()].get().reading
    }

    pub fn channel_status(&self, channel: ChannelId) -> ChannelStatus {
        self.state.channels[channel.index()].get()
    }

    pub fn frequency(&self) -> LineFrequency {
        self.state.frequency.get()
    }

    pub fn latch(&self) -> TrippingLatch {
        self.state.latch.get()
    }

    pub fn reference_window(&self) -> SampleWindow {
        self.state.reference_window.get()
    }

    pub fn spectral_analyzer(&self, scale: AnalogScale) -> SpectralAnalyzer<'a> {
        SpectralAnalyzer::new(&self.state.reference_window, &self.state.frequency, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::RegulatorState;
    use crate::{analog::ChannelId, frequency::LineFrequency};

    #[test]
    fn split_only_once() {
        let state = RegulatorState::new(LineFrequency::from_hz(50.0));
        assert!(state.split().is_some());
        assert!(state.split().is_none());
    }

    #[test]
    fn monitor_ports_follow_channel_order() {
        let state = RegulatorState::new(LineFrequency::from_hz(50.0));
        let parts = state.split().unwrap();

        for (i, ports) in parts.monitors.iter().enumerate() {
            assert_eq!(ports.channel.index(), i);
        }
    }

    #[test]
    fn telemetry_sees_published_status() {
        let state = RegulatorState::new(LineFrequency::from_hz(50.0));
        let mut parts = state.split().unwrap();

        let mut status = parts.monitors[1].status.current();
        status.reading.rms = 2.5;
        parts.monitors[1].status.publish(status);

        let ch = ChannelId::new(1).unwrap();
        assert_eq!(parts.telemetry.channel(ch).rms, 2.5);
        assert_eq!(parts.telemetry.channel(ChannelId::new(0).unwrap()).rms, 0.0);
    }
}
