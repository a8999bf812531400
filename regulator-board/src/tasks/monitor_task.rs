use embassy_executor::SendSpawner;

use lib_regulator::{config::DEFAULT_CONFIG, state::MonitorPorts, ChannelMonitor, CHANNEL_COUNT};

use crate::drivers::tick_timer::SoftTimerPort;

#[embassy_executor::task(pool_size = CHANNEL_COUNT)]
async fn monitor_task_entry(mut monitor: ChannelMonitor<'static>, timers: &'static SoftTimerPort) -> ! {
    monitor.run(timers).await
}

pub fn start_monitor_tasks(
    spawner: SendSpawner,
    ports: [MonitorPorts<'static>; CHANNEL_COUNT],
    timers: &'static SoftTimerPort,
) {
    for ports in ports {
        let monitor = ChannelMonitor::new(ports, &DEFAULT_CONFIG);
        spawner
            .spawn(monitor_task_entry(monitor, timers))
            .expect("failed to spawn channel monitor");
    }
}
