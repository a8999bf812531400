use embassy_executor::SendSpawner;

use lib_regulator::{config::DEFAULT_CONFIG, state::SchedulerPorts, SampleScheduler};

use crate::drivers::{analog::AdcFrontEnd, tick_timer::SoftTimerPort};

#[embassy_executor::task]
async fn sampling_task_entry(mut scheduler: SampleScheduler<'static, AdcFrontEnd>, timers: &'static SoftTimerPort) -> ! {
    scheduler.start(timers);
    scheduler.run(timers).await
}

pub fn start_sampling_task(
    spawner: SendSpawner,
    ports: SchedulerPorts<'static>,
    adc: AdcFrontEnd,
    timers: &'static SoftTimerPort,
) {
    let scheduler = SampleScheduler::new(ports, adc, &DEFAULT_CONFIG);
    spawner
        .spawn(sampling_task_entry(scheduler, timers))
        .expect("failed to spawn sampling task");
}
