#![no_std]
#![no_main]

use defmt::*;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use cortex_m_rt::entry;
use embassy_executor::{Executor, InterruptExecutor};
use embassy_stm32::interrupt::{self, InterruptExt, Priority};
use embassy_sync::mutex::Mutex;

use lib_regulator::{
    config::DEFAULT_CONFIG,
    frequency::LineFrequency,
    state::RegulatorState,
    storage::{PersistentSettings, PhraseStorage},
    timer::{TimerId, TimerPort},
};
use regulator_board::{
    clocks::get_system_config,
    drivers::{
        analog::{AdcFrontEnd, DacActuators},
        flash::FlashSector,
        tick_timer::SoftTimerPort,
    },
    tasks::{
        monitor_task::start_monitor_tasks, sampling_task::start_sampling_task,
        status_task::start_status_task, tick_task::start_tick_sources,
        tripping_task::start_tripping_task, SharedSettings,
    },
};

static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_MEDIUM: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_LOW: StaticCell<Executor> = StaticCell::new();

static REGULATOR_STATE: StaticCell<RegulatorState> = StaticCell::new();
static SETTINGS: StaticCell<SharedSettings> = StaticCell::new();
static TIMERS: SoftTimerPort = SoftTimerPort::new();

#[interrupt]
unsafe fn UART4() {
    EXECUTOR_HIGH.on_interrupt();
}

#[interrupt]
unsafe fn UART5() {
    EXECUTOR_MEDIUM.on_interrupt();
}

#[entry]
fn main() -> ! {
    let p = embassy_stm32::init(get_system_config());
    info!("regulator startup!");

    let adc = AdcFrontEnd::new(p.ADC1, p.PA0, p.PA1, p.PA2);
    let actuators = DacActuators::new(p.DAC1, p.PA4, p.PA5, p.DAC2, p.PA6);

    // a fresh allocation map always has room for the three settings slots
    let settings = unwrap!(PersistentSettings::load(PhraseStorage::new(FlashSector::new(p.FLASH))));
    let settings: &'static SharedSettings = SETTINGS.init(Mutex::new(settings));

    let state: &'static RegulatorState =
        REGULATOR_STATE.init(RegulatorState::new(LineFrequency::from_hz(DEFAULT_CONFIG.frequency.nominal_hz)));
    let parts = unwrap!(state.split());

    // slow timer is programmed up front and stays off until a channel alarms
    TIMERS.set_period(TimerId::Tripping, DEFAULT_CONFIG.tripping_period_ns(), false);

    // High-priority executor: UART4, priority level 6
    // tick sources and channel monitors
    interrupt::UART4.set_priority(Priority::P6);
    let spawner = EXECUTOR_HIGH.start(interrupt::UART4);
    start_tick_sources(spawner, &TIMERS, state);
    start_monitor_tasks(spawner, parts.monitors, &TIMERS);

    // Medium-priority executor: UART5, priority level 7
    // sample scheduler, starts the sampling timer itself
    interrupt::UART5.set_priority(Priority::P7);
    let spawner = EXECUTOR_MEDIUM.start(interrupt::UART5);
    start_sampling_task(spawner, parts.scheduler, adc, &TIMERS);

    // Low priority executor: runs in thread mode, using WFE/SEV
    // tripping timer and status reporting
    let executor = EXECUTOR_LOW.init(Executor::new());
    executor.run(|spawner| {
        start_tripping_task(spawner, parts.tripping, actuators, settings, &TIMERS);
        start_status_task(spawner, parts.telemetry, settings);
    });
}
