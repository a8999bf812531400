use crate::{analog::AnalogScale, WINDOW_SIZE};

/// One line cycle of raw samples for a single channel.
///
/// The scheduler fills it in place, slot by slot, and hands out copies once
/// all `WINDOW_SIZE` slots of the cycle are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleWindow {
    samples: [i16; WINDOW_SIZE],
}

impl SampleWindow {
    pub const EMPTY: SampleWindow = SampleWindow { samples: [0; WINDOW_SIZE] };

    pub const fn from_samples(samples: [i16; WINDOW_SIZE]) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16; WINDOW_SIZE] {
        &self.samples
    }

    pub fn sample(&self, position: usize) -> i16 {
        assert!(position < WINDOW_SIZE, "window position out of range");
        self.samples[position]
    }

    pub fn set(&mut self, position: usize, sample: i16) {
        assert!(position < WINDOW_SIZE, "window position out of range");
        self.samples[position] = sample;
    }

    pub fn voltages<'a>(&'a self, scale: &'a AnalogScale) -> impl Iterator<Item = f32> + 'a {
        self.samples.iter().map(move |raw| scale.raw_to_voltage(*raw))
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::EMPTY
    }
}
