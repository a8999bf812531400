use embassy_executor::Spawner;

use lib_regulator::{config::DEFAULT_CONFIG, state::TrippingPorts, TrippingTimer};

use crate::{
    drivers::{analog::DacActuators, tick_timer::SoftTimerPort},
    tasks::SharedSettings,
};

#[embassy_executor::task]
async fn tripping_task_entry(
    mut tripping: TrippingTimer<'static, DacActuators>,
    settings: &'static SharedSettings,
    timers: &'static SoftTimerPort,
) -> ! {
    tripping.run(settings, timers).await
}

pub fn start_tripping_task(
    spawner: Spawner,
    ports: TrippingPorts<'static>,
    actuators: DacActuators,
    settings: &'static SharedSettings,
    timers: &'static SoftTimerPort,
) {
    let tripping = TrippingTimer::new(ports, actuators, &DEFAULT_CONFIG);
    spawner
        .spawn(tripping_task_entry(tripping, settings, timers))
        .expect("failed to spawn tripping task");
}
