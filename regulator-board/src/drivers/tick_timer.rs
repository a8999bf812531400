//! Both timer channels of the timer port, run as embassy-time tasks on the
//! highest priority executor.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_futures::select::{select, Either};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};

use lib_regulator::{
    state::RegulatorMutex,
    sync::TickSignal,
    timer::{TimerId, TimerPort},
};

struct TimerChannel {
    period_ns: AtomicU32,
    enabled: AtomicBool,
    reconfigured: Signal<RegulatorMutex, ()>,
}

impl TimerChannel {
    const fn new() -> Self {
        Self {
            period_ns: AtomicU32::new(0),
            enabled: AtomicBool::new(false),
            reconfigured: Signal::new(),
        }
    }

    fn period(&self) -> Duration {
        Duration::from_nanos(self.period_ns.load(Ordering::Acquire) as u64)
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

pub struct SoftTimerPort {
    channels: [TimerChannel; 2],
}

impl SoftTimerPort {
    pub const fn new() -> Self {
        Self {
            channels: [TimerChannel::new(), TimerChannel::new()],
        }
    }

    fn channel(&self, timer: TimerId) -> &TimerChannel {
        &self.channels[timer.index()]
    }
}

impl Default for SoftTimerPort {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerPort for SoftTimerPort {
    fn set_period(&self, timer: TimerId, period_ns: u32, restart: bool) {
        let channel = self.channel(timer);
        channel.period_ns.store(period_ns, Ordering::Release);
        if restart {
            channel.reconfigured.signal(());
        }
    }

    fn enable(&self, timer: TimerId, enable: bool) {
        let channel = self.channel(timer);
        if channel.enabled.swap(enable, Ordering::AcqRel) != enable {
            channel.reconfigured.signal(());
        }
    }
}

/// Releases `tick` once per period while the channel is enabled. A restart or
/// an enable change re-anchors the phase at the moment it is observed.
#[embassy_executor::task(pool_size = 2)]
pub async fn tick_source_task(timer: TimerId, port: &'static SoftTimerPort, tick: &'static TickSignal) -> ! {
    let channel = port.channel(timer);

    loop {
        if !channel.is_enabled() {
            channel.reconfigured.wait().await;
            continue;
        }

        let mut next = Instant::now() + channel.period();
        loop {
            match select(Timer::at(next), channel.reconfigured.wait()).await {
                Either::First(()) => {
                    tick.release();
                    next += channel.period();
                }
                Either::Second(()) => break,
            }
        }
    }
}
