//! Request handling for the host link. Raw indices and codes arrive as bytes
//! and are validated here, before anything reaches the core.

use embassy_sync::mutex::Mutex;

use crate::{
    analog::{AnalogScale, ChannelId},
    channel::ChannelReading,
    spectrum::{Harmonic, HarmonicReading},
    state::{RegulatorMutex, Telemetry},
    storage::{PersistentSettings, StorageError, StoragePort},
    tripping::{TimingMode, TripDirection},
    ConfigError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    GetTimingMode,
    SetTimingMode(u8),
    GetRaiseCount,
    ResetRaiseCount,
    GetLowerCount,
    ResetLowerCount,
    GetFrequency,
    GetVoltage(u8),
    GetSpectrum(u8),
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    TimingMode(TimingMode),
    Count(u8),
    Frequency(f32),
    Voltage(ChannelReading),
    Spectrum(HarmonicReading),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    Config(ConfigError),
    Storage(StorageError),
}

impl From<ConfigError> for CommandError {
    fn from(e: ConfigError) -> Self {
        CommandError::Config(e)
    }
}

impl From<StorageError> for CommandError {
    fn from(e: StorageError) -> Self {
        CommandError::Storage(e)
    }
}

pub struct CommandHandler<'a, S: StoragePort> {
    telemetry: Telemetry<'a>,
    scale: AnalogScale,
    settings: &'a Mutex<RegulatorMutex, PersistentSettings<S>>,
}

impl<'a, S: StoragePort> CommandHandler<'a, S> {
    pub fn new(telemetry: Telemetry<'a>, scale: AnalogScale, settings: &'a Mutex<RegulatorMutex, PersistentSettings<S>>) -> Self {
        Self {
            telemetry,
            scale,
            settings,
        }
    }

    pub async fn handle(&self, request: Request) -> Result<Response, CommandError> {
        let response = match request {
            Request::GetTimingMode => Response::TimingMode(self.settings.lock().await.timing_mode()),
            Request::SetTimingMode(raw) => {
                let mode = TimingMode::try_from(raw)?;
                self.settings.lock().await.set_timing_mode(mode)?;
                info!("timing mode set to {:?}", mode);
                Response::Done
            }
            Request::GetRaiseCount => Response::Count(self.settings.lock().await.raise_count()),
            Request::GetLowerCount => Response::Count(self.settings.lock().await.lower_count()),
            Request::ResetRaiseCount => {
                self.settings.lock().await.reset_count(TripDirection::Raise)?;
                Response::Done
            }
            Request::ResetLowerCount => {
                self.settings.lock().await.reset_count(TripDirection::Lower)?;
                Response::Done
            }
            Request::GetFrequency => Response::Frequency(self.telemetry.frequency().frequency_hz),
            Request::GetVoltage(raw) => {
                let channel = ChannelId::new(raw)?;
                Response::Voltage(self.telemetry.channel(channel))
            }
            Request::GetSpectrum(raw) => {
                let harmonic = Harmonic::new(raw)?;
                let analyzer = self.telemetry.spectral_analyzer(self.scale);
                Response::Spectrum(analyzer.analyze(harmonic))
            }
        };

        Ok(response)
    }
}
