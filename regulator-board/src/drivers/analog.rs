use embassy_stm32::{
    adc::{Adc, AdcChannel, AnyAdcChannel, SampleTime},
    dac::{Dac, DacCh1, Value},
    mode::Blocking,
};

use lib_regulator::{
    analog::{AnalogError, AnalogInput, AnalogOutput, ChannelId, OutputChannel},
    CHANNEL_COUNT,
};

use crate::pins::*;

const ADC_MID_SCALE: i32 = 2048;
const ADC_MAX: u16 = 4095;

/// Re-centres a mid-biased 12-bit conversion and left aligns it into the
/// signed 16-bit raw range.
pub const fn center_sample(sample: u16) -> i16 {
    let sample = if sample > ADC_MAX { ADC_MAX } else { sample };
    ((sample as i32 - ADC_MID_SCALE) << 4) as i16
}

/// Non-negative raw levels onto the 12-bit DAC, negative levels clamp to 0.
pub const fn dac_code(raw: i16) -> u16 {
    if raw <= 0 {
        0
    } else {
        (raw as u16) >> 3
    }
}

pub struct AdcFrontEnd {
    adc: Adc<'static, LineSenseAdc>,
    channels: [AnyAdcChannel<LineSenseAdc>; CHANNEL_COUNT],
}

impl AdcFrontEnd {
    pub fn new(adc: LineSenseAdc, ch0: LineSense0Pin, ch1: LineSense1Pin, ch2: LineSense2Pin) -> Self {
        let mut adc = Adc::new(adc);
        adc.set_sample_time(SampleTime::CYCLES24_5);

        Self {
            adc,
            channels: [ch0.degrade_adc(), ch1.degrade_adc(), ch2.degrade_adc()],
        }
    }
}

impl AnalogInput for AdcFrontEnd {
    fn read(&mut self, channel: ChannelId) -> Result<i16, AnalogError> {
        let pin = self
            .channels
            .get_mut(channel.index())
            .ok_or(AnalogError::InvalidChannel)?;
        Ok(center_sample(self.adc.blocking_read(pin)))
    }
}

/// Raise and lower on DAC1, alarm on DAC2. Output index order follows
/// `ActuatorMap` defaults: 0 raise, 1 lower, 2 alarm.
pub struct DacActuators {
    dac: Dac<'static, ActuatorDac, Blocking>,
    alarm: DacCh1<'static, AlarmDac, Blocking>,
}

impl DacActuators {
    pub fn new(dac: ActuatorDac, raise_pin: RaiseDacPin, lower_pin: LowerDacPin, alarm_dac: AlarmDac, alarm_pin: AlarmDacPin) -> Self {
        let mut dac = Dac::new_blocking(dac, raise_pin, lower_pin);
        dac.ch1().set(Value::Bit12Right(0));
        dac.ch1().enable();
        dac.ch2().set(Value::Bit12Right(0));
        dac.ch2().enable();

        let mut alarm = DacCh1::new_blocking(alarm_dac, alarm_pin);
        alarm.set(Value::Bit12Right(0));
        alarm.enable();

        Self { dac, alarm }
    }
}

impl AnalogOutput for DacActuators {
    fn write(&mut self, channel: OutputChannel, raw: i16) -> Result<(), AnalogError> {
        let value = Value::Bit12Right(dac_code(raw));
        match channel.index() {
            0 => self.dac.ch1().set(value),
            1 => self.dac.ch2().set(value),
            2 => self.alarm.set(value),
            _ => return Err(AnalogError::InvalidChannel),
        }
        Ok(())
    }
}
