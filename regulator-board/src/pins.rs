use embassy_stm32::peripherals::*;

////////////////////
//  line sensing  //
////////////////////

pub type LineSenseAdc = ADC1;
pub type LineSense0Pin = PA0; // ADC1_IN1
pub type LineSense1Pin = PA1; // ADC1_IN2
pub type LineSense2Pin = PA2; // ADC1_IN3

/////////////////
//  actuators  //
/////////////////

pub type ActuatorDac = DAC1;
pub type RaiseDacPin = PA4; // DAC1_OUT1
pub type LowerDacPin = PA5; // DAC1_OUT2
pub type AlarmDac = DAC2;
pub type AlarmDacPin = PA6; // DAC2_OUT1

////////////////
//  settings  //
////////////////

pub type SettingsFlash = FLASH;
