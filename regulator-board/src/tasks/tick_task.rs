use defmt::info;
use embassy_executor::SendSpawner;

use lib_regulator::{state::RegulatorState, timer::TimerId};

use crate::drivers::tick_timer::{tick_source_task, SoftTimerPort};

pub fn start_tick_sources(spawner: SendSpawner, timers: &'static SoftTimerPort, state: &'static RegulatorState) {
    for timer in [TimerId::Sampling, TimerId::Tripping] {
        spawner
            .spawn(tick_source_task(timer, timers, state.tick_signal(timer)))
            .expect("failed to spawn tick source");
        info!("{:?} tick source started", timer);
    }
}
