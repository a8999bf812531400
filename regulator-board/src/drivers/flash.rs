use defmt::error;
use embassy_stm32::{
    flash::{Flash, FLASH_SIZE, MAX_ERASE_SIZE},
    mode::Blocking,
};

use lib_regulator::storage::{SectorDevice, StorageError, PHRASE_SIZE};

use crate::pins::SettingsFlash;

/// The last erase page of main flash, holding the settings phrase at its
/// start.
pub struct FlashSector {
    flash: Flash<'static, Blocking>,
    offset: u32,
}

impl FlashSector {
    pub fn new(flash: SettingsFlash) -> Self {
        Self {
            flash: Flash::new_blocking(flash),
            offset: (FLASH_SIZE - MAX_ERASE_SIZE) as u32,
        }
    }
}

impl SectorDevice for FlashSector {
    fn read_phrase(&mut self) -> Result<[u8; PHRASE_SIZE], StorageError> {
        let mut phrase = [0u8; PHRASE_SIZE];
        self.flash.blocking_read(self.offset, &mut phrase).map_err(|e| {
            error!("settings read failed: {:?}", e);
            StorageError::ReadFailed
        })?;
        Ok(phrase)
    }

    fn program_phrase(&mut self, phrase: &[u8; PHRASE_SIZE]) -> Result<(), StorageError> {
        self.flash.blocking_write(self.offset, phrase).map_err(|e| {
            error!("settings write failed: {:?}", e);
            StorageError::WriteFailed
        })
    }

    fn erase(&mut self) -> Result<(), StorageError> {
        self.flash
            .blocking_erase(self.offset, self.offset + MAX_ERASE_SIZE as u32)
            .map_err(|e| {
                error!("settings erase failed: {:?}", e);
                StorageError::EraseFailed
            })
    }
}
