use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_time::{Duration, Ticker};

use lib_regulator::{
    command::{CommandHandler, Request},
    config::DEFAULT_CONFIG,
    state::Telemetry,
};

use crate::tasks::{SettingsStorage, SharedSettings};

const STATUS_PERIOD_MS: u64 = 1000;

const STATUS_REQUESTS: [Request; 7] = [
    Request::GetFrequency,
    Request::GetVoltage(0),
    Request::GetVoltage(1),
    Request::GetVoltage(2),
    Request::GetSpectrum(1),
    Request::GetRaiseCount,
    Request::GetLowerCount,
];

/// Periodic status report through the command surface. There is no host
/// transport on this board, responses go to the defmt log.
#[embassy_executor::task]
async fn status_task_entry(handler: CommandHandler<'static, SettingsStorage>) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(STATUS_PERIOD_MS));

    loop {
        for request in STATUS_REQUESTS {
            match handler.handle(request).await {
                Ok(response) => info!("{:?}: {:?}", request, response),
                Err(e) => warn!("{:?} failed: {:?}", request, e),
            }
        }

        ticker.next().await;
    }
}

pub fn start_status_task(spawner: Spawner, telemetry: Telemetry<'static>, settings: &'static SharedSettings) {
    let handler = CommandHandler::new(telemetry, DEFAULT_CONFIG.scale, settings);
    spawner
        .spawn(status_task_entry(handler))
        .expect("failed to spawn status task");
}
