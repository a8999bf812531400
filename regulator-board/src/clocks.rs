use embassy_stm32::{
    rcc::{
        mux::Adcsel, AHBPrescaler, APBPrescaler, Pll, PllMul, PllPDiv, PllPreDiv, PllQDiv, PllRDiv,
        PllSource, Sysclk,
    },
    Config,
};

/// 170 MHz from the internal oscillator, no crystal is fitted.
pub fn get_system_config() -> Config {
    let mut config = Config::default();

    config.rcc.pll = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV4,   // 16 MHz HSI down to 4 MHz
        mul: PllMul::MUL85,        // 340 MHz VCO
        divp: Some(PllPDiv::DIV2), // 170 MHz, ADC kernel clock
        divq: Some(PllQDiv::DIV2),
        divr: Some(PllRDiv::DIV2), // 170 MHz sysclk
    });

    config.rcc.mux.adc12sel = Adcsel::PLL1_P;

    config.rcc.ahb_pre = AHBPrescaler::DIV1;
    config.rcc.apb1_pre = APBPrescaler::DIV1;
    config.rcc.apb2_pre = APBPrescaler::DIV1;

    config.rcc.sys = Sysclk::PLL1_R;

    config
}
