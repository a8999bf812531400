use crate::{
    analog::{AnalogScale, ChannelId, FULL_SCALE_VOLTS_DEFAULT},
    channel::ThresholdParameters,
    frequency::FrequencyBand,
    timer::period_ns_from_hz,
    tripping::{ActuatorMap, TripCurveParameters},
};

///////////////////////
//  channel limits   //
///////////////////////

pub const CHANNEL_TOO_LOW_VOLTS: f32 = 2.0;
pub const CHANNEL_TOO_HIGH_VOLTS: f32 = 3.0;

///////////////////
//  trip curve   //
///////////////////

pub const TRIP_TICK_RATE_HZ: u32 = 100;
pub const TRIP_THRESHOLD: u32 = 2500;
pub const DEFINITE_STEP: u32 = 5;
pub const INVERSE_NUMERATOR: f32 = 25.0;
pub const INVERSE_SCALE: f32 = 0.5;
pub const INVERSE_MULTIPLIER: f32 = 5.0;
pub const INVERSE_MIN_STEP: u32 = 1;
pub const INVERSE_MAX_STEP: u32 = 25;
pub const ACTUATOR_EXCITATION_VOLTS: f32 = 5.0;

/////////////////////
//  line frequency //
/////////////////////

pub const LINE_NOMINAL_HZ: f32 = 50.0;
pub const LINE_TOLERANCE_HZ: f32 = 2.5;

pub const RAISE_OUTPUT: u8 = 0;
pub const LOWER_OUTPUT: u8 = 1;
pub const ALARM_OUTPUT: u8 = 2;

pub const REFERENCE_CHANNEL: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegulatorConfig {
    pub scale: AnalogScale,
    pub thresholds: ThresholdParameters,
    pub trip_curve: TripCurveParameters,
    pub frequency: FrequencyBand,
    pub actuators: ActuatorMap,
    /// channel the frequency tracker and spectral analyzer follow
    pub reference_channel: ChannelId,
}

impl RegulatorConfig {
    pub const fn tripping_period_ns(&self) -> u32 {
        period_ns_from_hz(self.trip_curve.tick_rate_hz)
    }
}

pub const DEFAULT_CONFIG: RegulatorConfig = RegulatorConfig {
    scale: AnalogScale::new(FULL_SCALE_VOLTS_DEFAULT),
    thresholds: ThresholdParameters {
        low_volts: CHANNEL_TOO_LOW_VOLTS,
        high_volts: CHANNEL_TOO_HIGH_VOLTS,
    },
    trip_curve: TripCurveParameters {
        tick_rate_hz: TRIP_TICK_RATE_HZ,
        trip_threshold: TRIP_THRESHOLD,
        definite_step: DEFINITE_STEP,
        inverse_numerator: INVERSE_NUMERATOR,
        inverse_scale: INVERSE_SCALE,
        inverse_multiplier: INVERSE_MULTIPLIER,
        min_step: INVERSE_MIN_STEP,
        max_step: INVERSE_MAX_STEP,
        excitation_volts: ACTUATOR_EXCITATION_VOLTS,
    },
    frequency: FrequencyBand {
        nominal_hz: LINE_NOMINAL_HZ,
        tolerance_hz: LINE_TOLERANCE_HZ,
    },
    actuators: match ActuatorMap::new(RAISE_OUTPUT, LOWER_OUTPUT, ALARM_OUTPUT) {
        Ok(map) => map,
        Err(_) => panic!("actuator outputs must be distinct and in range"),
    },
    reference_channel: match ChannelId::new(REFERENCE_CHANNEL) {
        Ok(ch) => ch,
        Err(_) => panic!("reference channel out of range"),
    },
};
