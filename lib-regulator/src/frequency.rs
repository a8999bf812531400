//! Line frequency estimation from zero crossings of the reference channel.
//!
//! Crossings are negative to non-negative transitions only. The exact crossing
//! instant is linearly interpolated between the two samples that straddle
//! zero, and each accepted crossing becomes the start of the next
//! measurement.

use crate::{timer::NANOS_PER_SECOND, WINDOW_SIZE};

/// Plausible band for the line frequency, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrequencyBand {
    pub nominal_hz: f32,
    pub tolerance_hz: f32,
}

impl FrequencyBand {
    pub fn contains(&self, frequency_hz: f32) -> bool {
        frequency_hz >= self.nominal_hz - self.tolerance_hz
            && frequency_hz <= self.nominal_hz + self.tolerance_hz
    }
}

/// Last accepted line frequency and the timing derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineFrequency {
    pub frequency_hz: f32,
    pub period_ns: u32,
    /// one line period split into `WINDOW_SIZE` slots
    pub sampling_interval_ns: u32,
}

impl LineFrequency {
    pub fn from_hz(frequency_hz: f32) -> Self {
        let period_ns = libm::roundf(NANOS_PER_SECOND as f32 / frequency_hz) as u32;
        Self {
            frequency_hz,
            period_ns,
            sampling_interval_ns: period_ns / WINDOW_SIZE as u32,
        }
    }

    /// Rate the window slots are filled at, used to place spectral bins.
    pub fn sample_rate_hz(&self) -> f32 {
        self.frequency_hz * WINDOW_SIZE as f32
    }
}

pub struct FrequencyTracker {
    band: FrequencyBand,
    current: LineFrequency,
    previous: Option<i16>,
    /// fractional position of the last crossing inside its sampling interval
    crossing_offset: Option<f32>,
    intervals_since_crossing: u32,
}

impl FrequencyTracker {
    pub fn new(band: FrequencyBand) -> Self {
        Self {
            band,
            current: LineFrequency::from_hz(band.nominal_hz),
            previous: None,
            crossing_offset: None,
            intervals_since_crossing: 0,
        }
    }

    pub fn current(&self) -> LineFrequency {
        self.current
    }

    /// A reference sample was lost. The interval still elapsed, so the
    /// measurement in progress can no longer be timed and is dropped.
    pub fn skip(&mut self) {
        self.previous = None;
        self.crossing_offset = None;
        self.intervals_since_crossing = 0;
    }

    /// Feed the next reference sample. Returns the new estimate when a
    /// measurement completes inside the band. Out of band measurements are
    /// dropped and the previous estimate stays in effect.
    pub fn push(&mut self, sample: i16) -> Option<LineFrequency> {
        let previous = self.previous.replace(sample)?;

        if self.crossing_offset.is_some() {
            self.intervals_since_crossing += 1;
        }

        if !(previous < 0 && sample >= 0) {
            return None;
        }

        let prev = previous as f32;
        let offset = -prev / (sample as f32 - prev);

        let Some(start_offset) = self.crossing_offset.replace(offset) else {
            self.intervals_since_crossing = 0;
            return None;
        };

        // crossing #1 sits `start_offset` into the interval that ended
        // `intervals_since_crossing` intervals ago, crossing #2 sits `offset`
        // into the interval that just ended.
        let intervals = self.intervals_since_crossing as f32 - start_offset + offset;
        self.intervals_since_crossing = 0;

        let period_s = intervals * self.current.sampling_interval_ns as f32 / NANOS_PER_SECOND as f32;
        if period_s <= 0.0 {
            return None;
        }

        let frequency_hz = 1.0 / period_s;
        if !self.band.contains(frequency_hz) {
            trace!("rejected line frequency estimate {} Hz", frequency_hz);
            return None;
        }

        self.current = LineFrequency::from_hz(frequency_hz);
        Some(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONFIG;
    use core::f32::consts::PI;

    fn sine_samples(frequency_hz: f32, sample_rate_hz: f32, count: usize) -> impl Iterator<Item = i16> {
        (0..count).map(move |n| {
            let t = n as f32 / sample_rate_hz;
            (10_000.0 * libm::sinf(2.0 * PI * frequency_hz * t + 0.3)) as i16
        })
    }

    #[test]
    fn default_timing() {
        let f = LineFrequency::from_hz(50.0);
        assert_eq!(f.period_ns, 20_000_000);
        assert_eq!(f.sampling_interval_ns, 1_250_000);
    }

    #[test]
    fn first_crossing_only_arms() {
        let mut tracker = FrequencyTracker::new(DEFAULT_CONFIG.frequency);
        assert_eq!(tracker.push(-5), None);
        assert_eq!(tracker.push(5), None);
        assert_eq!(tracker.current().frequency_hz, 50.0);
    }

    #[test]
    fn nominal_line_is_tracked() {
        let mut tracker = FrequencyTracker::new(DEFAULT_CONFIG.frequency);
        let mut last = None;
        for s in sine_samples(50.0, 800.0, 16 * 4) {
            if let Some(f) = tracker.push(s) {
                last = Some(f);
            }
        }

        let f = last.unwrap();
        assert!((f.frequency_hz - 50.0).abs() < 0.1, "estimated {}", f.frequency_hz);
    }

    #[test]
    fn off_nominal_line_is_tracked() {
        let mut tracker = FrequencyTracker::new(DEFAULT_CONFIG.frequency);
        let mut last = None;
        // sampled at the nominal rate, the first estimate is taken before any retune
        for s in sine_samples(51.0, 800.0, 16 * 3) {
            if let Some(f) = tracker.push(s) {
                last = Some(f);
                break;
            }
        }

        let f = last.unwrap();
        assert!((f.frequency_hz - 51.0).abs() < 0.1, "estimated {}", f.frequency_hz);
    }

    #[test]
    fn lost_sample_drops_the_measurement() {
        let mut tracker = FrequencyTracker::new(DEFAULT_CONFIG.frequency);
        let mut first = None;
        for (n, s) in sine_samples(48.0, 800.0, 16 * 5).enumerate() {
            if n == 20 {
                tracker.skip();
                continue;
            }
            if let Some(f) = tracker.push(s) {
                first = Some((n, f));
                break;
            }
        }

        // the crossing near sample 16 was armed before the gap and must not be used
        let (n, f) = first.unwrap();
        assert!(n > 40, "estimate completed at sample {}", n);
        assert!((f.frequency_hz - 48.0).abs() < 0.1, "estimated {}", f.frequency_hz);
    }

    #[test]
    fn out_of_band_is_rejected() {
        let mut tracker = FrequencyTracker::new(DEFAULT_CONFIG.frequency);
        for s in sine_samples(40.0, 800.0, 16 * 6) {
            assert_eq!(tracker.push(s), None);
        }
        assert_eq!(tracker.current().frequency_hz, 50.0);
    }

    #[test]
    fn band_edges_are_inclusive() {
        let band = DEFAULT_CONFIG.frequency;
        assert!(band.contains(47.5));
        assert!(band.contains(52.5));
        assert!(!band.contains(52.6));
    }
}
