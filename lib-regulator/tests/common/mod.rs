#![allow(dead_code)]

use std::cell::RefCell;

use lib_regulator::{
    analog::{AnalogError, AnalogInput, AnalogOutput, ChannelId, OutputChannel},
    storage::{PhraseStorage, SectorDevice, StorageError, ERASED_BYTE, PHRASE_SIZE},
    timer::{TimerId, TimerPort},
    OUTPUT_COUNT,
};

/// Produces `source(channel, n)` for the n-th read of a channel. Reads listed
/// in `failures` as (channel, n) time out instead.
pub struct ScriptedInput<F: FnMut(ChannelId, usize) -> i16> {
    source: F,
    reads: [usize; lib_regulator::CHANNEL_COUNT],
    pub failures: Vec<(u8, usize)>,
}

impl<F: FnMut(ChannelId, usize) -> i16> ScriptedInput<F> {
    pub fn new(source: F) -> Self {
        Self {
            source,
            reads: [0; lib_regulator::CHANNEL_COUNT],
            failures: Vec::new(),
        }
    }
}

impl<F: FnMut(ChannelId, usize) -> i16> AnalogInput for ScriptedInput<F> {
    fn read(&mut self, channel: ChannelId) -> Result<i16, AnalogError> {
        let n = self.reads[channel.index()];
        self.reads[channel.index()] += 1;

        if self.failures.contains(&(channel.number(), n)) {
            return Err(AnalogError::Timeout);
        }
        Ok((self.source)(channel, n))
    }
}

#[derive(Default)]
pub struct RecordingOutput {
    pub levels: [i16; OUTPUT_COUNT],
    pub writes: usize,
}

impl AnalogOutput for RecordingOutput {
    fn write(&mut self, channel: OutputChannel, raw: i16) -> Result<(), AnalogError> {
        self.levels[channel.index()] = raw;
        self.writes += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Period { period_ns: u32, restart: bool },
    Enable(bool),
}

#[derive(Default)]
pub struct RecordingTimer {
    pub events: RefCell<Vec<(TimerId, TimerEvent)>>,
    pub enabled: RefCell<[bool; 2]>,
}

impl RecordingTimer {
    pub fn is_enabled(&self, timer: TimerId) -> bool {
        self.enabled.borrow()[timer.index()]
    }

    pub fn periods(&self, timer: TimerId) -> Vec<u32> {
        self.events
            .borrow()
            .iter()
            .filter_map(|(id, event)| match event {
                TimerEvent::Period { period_ns, .. } if *id == timer => Some(*period_ns),
                _ => None,
            })
            .collect()
    }
}

impl TimerPort for RecordingTimer {
    fn set_period(&self, timer: TimerId, period_ns: u32, restart: bool) {
        self.events.borrow_mut().push((timer, TimerEvent::Period { period_ns, restart }));
    }

    fn enable(&self, timer: TimerId, enable: bool) {
        self.enabled.borrow_mut()[timer.index()] = enable;
        self.events.borrow_mut().push((timer, TimerEvent::Enable(enable)));
    }
}

pub struct RamSector {
    pub phrase: [u8; PHRASE_SIZE],
    pub fail_writes: bool,
}

impl SectorDevice for RamSector {
    fn read_phrase(&mut self) -> Result<[u8; PHRASE_SIZE], StorageError> {
        Ok(self.phrase)
    }

    fn program_phrase(&mut self, phrase: &[u8; PHRASE_SIZE]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::WriteFailed);
        }
        self.phrase = *phrase;
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::EraseFailed);
        }
        self.phrase = [ERASED_BYTE; PHRASE_SIZE];
        Ok(())
    }
}

pub fn blank_storage() -> PhraseStorage<RamSector> {
    PhraseStorage::new(RamSector {
        phrase: [ERASED_BYTE; PHRASE_SIZE],
        fail_writes: false,
    })
}

/// Raw sample `n` of a sine with the given rms, `samples_per_cycle` slots
/// per period.
pub fn sine_raw(rms_volts: f32, samples_per_cycle: f32, n: usize) -> i16 {
    let scale = lib_regulator::DEFAULT_CONFIG.scale;
    let peak = rms_volts * core::f32::consts::SQRT_2;
    let angle = 2.0 * core::f32::consts::PI * n as f32 / samples_per_cycle + 0.3;
    scale.voltage_to_raw(peak * angle.sin())
}
