use embassy_sync::mutex::Mutex;

use lib_regulator::{
    state::RegulatorMutex,
    storage::{PersistentSettings, PhraseStorage},
};

use crate::drivers::flash::FlashSector;

pub mod monitor_task;
pub mod sampling_task;
pub mod status_task;
pub mod tick_task;
pub mod tripping_task;

pub type SettingsStorage = PhraseStorage<FlashSector>;
pub type SharedSettings = Mutex<RegulatorMutex, PersistentSettings<SettingsStorage>>;
