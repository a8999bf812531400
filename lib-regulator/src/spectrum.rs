use microfft::Complex32;

use crate::{
    analog::AnalogScale,
    frequency::LineFrequency,
    state::SnapshotCell,
    window::SampleWindow,
    ConfigError, WINDOW_SIZE,
};

/// DFT bin index of the reference window, always below `WINDOW_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Harmonic(u8);

impl Harmonic {
    pub const FUNDAMENTAL: Harmonic = Harmonic(1);

    pub const fn new(index: u8) -> Result<Self, ConfigError> {
        if (index as usize) < WINDOW_SIZE {
            Ok(Self(index))
        } else {
            Err(ConfigError::InvalidHarmonic)
        }
    }

    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HarmonicReading {
    /// peak amplitude in volts
    pub magnitude: f32,
    /// radians, cosine referenced
    pub phase: f32,
    pub frequency_hz: f32,
}

/// Side reader of the reference window. Works on a copy, so a request never
/// holds up the scheduler filling the next window.
pub struct SpectralAnalyzer<'a> {
    window: &'a SnapshotCell<SampleWindow>,
    frequency: &'a SnapshotCell<LineFrequency>,
    scale: AnalogScale,
}

impl<'a> SpectralAnalyzer<'a> {
    pub fn new(window: &'a SnapshotCell<SampleWindow>, frequency: &'a SnapshotCell<LineFrequency>, scale: AnalogScale) -> Self {
        Self { window, frequency, scale }
    }

    pub fn analyze(&self, harmonic: Harmonic) -> HarmonicReading {
        let snapshot = self.window.get();
        let line = self.frequency.get();
        analyze_window(&snapshot, &self.scale, line.sample_rate_hz(), harmonic)
    }
}

pub fn analyze_window(window: &SampleWindow, scale: &AnalogScale, sample_rate_hz: f32, harmonic: Harmonic) -> HarmonicReading {
    let mut buffer = [Complex32::new(0.0, 0.0); WINDOW_SIZE];
    for (bin, volts) in buffer.iter_mut().zip(window.voltages(scale)) {
        *bin = Complex32::new(volts, 0.0);
    }

    let spectrum = transform(&mut buffer);
    let k = harmonic.index();
    HarmonicReading {
        magnitude: magnitude(spectrum, k),
        phase: phase(spectrum, k),
        frequency_hz: frequency_of(WINDOW_SIZE, k, sample_rate_hz),
    }
}

pub fn transform(buffer: &mut [Complex32; WINDOW_SIZE]) -> &mut [Complex32; WINDOW_SIZE] {
    microfft::complex::cfft_16(buffer)
}

/// Single sided amplitude of bin `k`. DC and Nyquist are not doubled.
pub fn magnitude(spectrum: &[Complex32], k: usize) -> f32 {
    assert!(k < spectrum.len(), "harmonic bin out of range");

    let n = spectrum.len();
    let c = spectrum[k];
    let m = libm::sqrtf(c.re * c.re + c.im * c.im) / n as f32;
    if k == 0 || 2 * k == n {
        m
    } else {
        2.0 * m
    }
}

pub fn phase(spectrum: &[Complex32], k: usize) -> f32 {
    assert!(k < spectrum.len(), "harmonic bin out of range");
    libm::atan2f(spectrum[k].im, spectrum[k].re)
}

pub fn frequency_of(n: usize, k: usize, sample_rate_hz: f32) -> f32 {
    k as f32 * sample_rate_hz / n as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::PI;

    fn tone(amplitude: f32, cycles: f32, phase: f32, offset: f32) -> SampleWindow {
        let scale = AnalogScale::default();
        let mut samples = [0i16; WINDOW_SIZE];
        for (n, s) in samples.iter_mut().enumerate() {
            let v = offset + amplitude * libm::cosf(2.0 * PI * cycles * n as f32 / WINDOW_SIZE as f32 + phase);
            *s = scale.voltage_to_raw(v);
        }
        SampleWindow::from_samples(samples)
    }

    #[test]
    fn fundamental_amplitude_and_frequency() {
        let scale = AnalogScale::default();
        let window = tone(3.0, 1.0, 0.0, 0.0);

        let fundamental = analyze_window(&window, &scale, 800.0, Harmonic::FUNDAMENTAL);
        assert!((fundamental.magnitude - 3.0).abs() < 0.01, "magnitude {}", fundamental.magnitude);
        assert!(fundamental.phase.abs() < 0.01);
        assert_eq!(fundamental.frequency_hz, 50.0);

        let third = analyze_window(&window, &scale, 800.0, Harmonic::new(3).unwrap());
        assert!(third.magnitude < 0.01);
        assert_eq!(third.frequency_hz, 150.0);
    }

    #[test]
    fn dc_and_phase() {
        let scale = AnalogScale::default();
        let window = tone(1.0, 2.0, -PI / 2.0, 1.5);

        let dc = analyze_window(&window, &scale, 800.0, Harmonic::new(0).unwrap());
        assert!((dc.magnitude - 1.5).abs() < 0.01);

        let second = analyze_window(&window, &scale, 800.0, Harmonic::new(2).unwrap());
        assert!((second.magnitude - 1.0).abs() < 0.01);
        assert!((second.phase + PI / 2.0).abs() < 0.01);
    }

    #[test]
    fn harmonic_index_is_bounded() {
        assert!(Harmonic::new(15).is_ok());
        assert_eq!(Harmonic::new(16), Err(ConfigError::InvalidHarmonic));
    }

    #[test]
    #[should_panic]
    fn magnitude_rejects_out_of_range_bin() {
        let spectrum = [Complex32::new(0.0, 0.0); WINDOW_SIZE];
        magnitude(&spectrum, WINDOW_SIZE);
    }
}
