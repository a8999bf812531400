//! Non-volatile settings: timing mode and the two trip counters.
//!
//! Each value lives in a one byte slot. An erased slot reads `0xFF` and stands
//! for the default value, so a blank part boots with Definite timing and zero
//! counts.

use crate::tripping::{TimingMode, TripDirection, TripSettings};

/// Smallest independently programmable unit of the backing sector.
pub const PHRASE_SIZE: usize = 8;

pub const ERASED_BYTE: u8 = 0xFF;

/// Counters stop here, one below the erased pattern.
pub const COUNTER_MAX: u8 = 0xFE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    OutOfSpace,
    InvalidHandle,
    WriteFailed,
    EraseFailed,
    ReadFailed,
}

/// Region of the sector handed out by `allocate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotHandle {
    offset: usize,
    len: usize,
}

impl SlotHandle {
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn address(&self, index: usize) -> Result<usize, StorageError> {
        if index < self.len {
            Ok(self.offset + index)
        } else {
            Err(StorageError::InvalidHandle)
        }
    }
}

pub trait StoragePort {
    fn allocate(&mut self, size: usize) -> Result<SlotHandle, StorageError>;

    fn read_byte(&mut self, slot: SlotHandle, index: usize) -> Result<u8, StorageError>;

    fn write_byte(&mut self, slot: SlotHandle, index: usize, value: u8) -> Result<(), StorageError>;

    /// Returns every byte of the sector to `ERASED_BYTE`.
    fn erase_sector(&mut self) -> Result<(), StorageError>;
}

/// Raw sector access, one phrase at a time. Programming is only valid on an
/// erased phrase.
pub trait SectorDevice {
    fn read_phrase(&mut self) -> Result<[u8; PHRASE_SIZE], StorageError>;

    fn program_phrase(&mut self, phrase: &[u8; PHRASE_SIZE]) -> Result<(), StorageError>;

    fn erase(&mut self) -> Result<(), StorageError>;
}

/// Tracks which bytes of the phrase have been handed out. Slots are aligned
/// to their own size.
#[derive(Debug, Clone)]
pub struct AllocationMap<const N: usize> {
    used: [bool; N],
}

impl<const N: usize> AllocationMap<N> {
    pub const fn new() -> Self {
        Self { used: [false; N] }
    }

    pub fn allocate(&mut self, size: usize) -> Result<SlotHandle, StorageError> {
        if size == 0 || size > N {
            return Err(StorageError::OutOfSpace);
        }

        let mut offset = 0;
        while offset + size <= N {
            let span = &mut self.used[offset..offset + size];
            if span.iter().all(|used| !used) {
                span.fill(true);
                return Ok(SlotHandle { offset, len: size });
            }
            offset += size;
        }

        Err(StorageError::OutOfSpace)
    }

    pub fn free_bytes(&self) -> usize {
        self.used.iter().filter(|used| !**used).count()
    }
}

impl<const N: usize> Default for AllocationMap<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// `StoragePort` over a single phrase of a sector device. Byte writes read
/// the whole phrase, patch it, erase, and program it back. A failed program
/// re-writes the phrase as it was read.
pub struct PhraseStorage<D: SectorDevice> {
    device: D,
    map: AllocationMap<PHRASE_SIZE>,
}

impl<D: SectorDevice> PhraseStorage<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            map: AllocationMap::new(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: SectorDevice> StoragePort for PhraseStorage<D> {
    fn allocate(&mut self, size: usize) -> Result<SlotHandle, StorageError> {
        self.map.allocate(size)
    }

    fn read_byte(&mut self, slot: SlotHandle, index: usize) -> Result<u8, StorageError> {
        let address = slot.address(index)?;
        let phrase = self.device.read_phrase()?;
        Ok(phrase[address])
    }

    fn write_byte(&mut self, slot: SlotHandle, index: usize, value: u8) -> Result<(), StorageError> {
        let address = slot.address(index)?;
        let original = self.device.read_phrase()?;
        if original[address] == value {
            return Ok(());
        }

        let mut phrase = original;
        phrase[address] = value;
        self.device.erase()?;

        if let Err(e) = self.device.program_phrase(&phrase) {
            // put the neighbouring slots back so only this byte's update is lost
            let restored = self
                .device
                .erase()
                .and_then(|()| self.device.program_phrase(&original));
            if let Err(restore) = restored {
                error!("settings phrase lost, restore failed: {:?}", restore);
            }
            return Err(e);
        }
        Ok(())
    }

    fn erase_sector(&mut self) -> Result<(), StorageError> {
        self.device.erase()
    }
}

/// The three persisted values, cached in RAM and written through.
pub struct PersistentSettings<S: StoragePort> {
    storage: S,
    timing_slot: SlotHandle,
    raise_slot: SlotHandle,
    lower_slot: SlotHandle,
    timing_mode: TimingMode,
    raise_count: u8,
    lower_count: u8,
}

impl<S: StoragePort> PersistentSettings<S> {
    /// Allocates the slots and loads their values. Slots that are erased, or
    /// that cannot be read, take their defaults. Only a failed allocation is
    /// an error.
    pub fn load(mut storage: S) -> Result<Self, StorageError> {
        let timing_slot = storage.allocate(1)?;
        let raise_slot = storage.allocate(1)?;
        let lower_slot = storage.allocate(1)?;

        let timing_mode = match read_slot(&mut storage, timing_slot) {
            Some(raw) => TimingMode::try_from(raw).unwrap_or_else(|_| {
                warn!("stored timing mode {} invalid, using definite", raw);
                TimingMode::Definite
            }),
            None => TimingMode::Definite,
        };
        let raise_count = read_slot(&mut storage, raise_slot).unwrap_or(0).min(COUNTER_MAX);
        let lower_count = read_slot(&mut storage, lower_slot).unwrap_or(0).min(COUNTER_MAX);

        info!(
            "settings loaded: mode {:?}, raise {}, lower {}",
            timing_mode, raise_count, lower_count
        );

        Ok(Self {
            storage,
            timing_slot,
            raise_slot,
            lower_slot,
            timing_mode,
            raise_count,
            lower_count,
        })
    }

    pub fn timing_mode(&self) -> TimingMode {
        self.timing_mode
    }

    /// The cached mode is only updated once the write succeeds.
    pub fn set_timing_mode(&mut self, mode: TimingMode) -> Result<(), StorageError> {
        self.storage.write_byte(self.timing_slot, 0, mode.into())?;
        self.timing_mode = mode;
        Ok(())
    }

    pub fn count(&self, direction: TripDirection) -> u8 {
        match direction {
            TripDirection::Raise => self.raise_count,
            TripDirection::Lower => self.lower_count,
        }
    }

    pub fn raise_count(&self) -> u8 {
        self.raise_count
    }

    pub fn lower_count(&self) -> u8 {
        self.lower_count
    }

    /// Bumps a counter, holding at `COUNTER_MAX`.
    pub fn increment(&mut self, direction: TripDirection) -> Result<u8, StorageError> {
        let next = self.count(direction).saturating_add(1).min(COUNTER_MAX);
        self.store_count(direction, next)?;
        Ok(next)
    }

    pub fn reset_count(&mut self, direction: TripDirection) -> Result<(), StorageError> {
        self.store_count(direction, 0)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn store_count(&mut self, direction: TripDirection, value: u8) -> Result<(), StorageError> {
        let slot = match direction {
            TripDirection::Raise => self.raise_slot,
            TripDirection::Lower => self.lower_slot,
        };
        self.storage.write_byte(slot, 0, value)?;

        match direction {
            TripDirection::Raise => self.raise_count = value,
            TripDirection::Lower => self.lower_count = value,
        }
        Ok(())
    }
}

impl<S: StoragePort> TripSettings for PersistentSettings<S> {
    fn timing_mode(&self) -> TimingMode {
        self.timing_mode
    }

    fn record_trip(&mut self, direction: TripDirection) -> Result<u8, StorageError> {
        self.increment(direction)
    }
}

fn read_slot<S: StoragePort>(storage: &mut S, slot: SlotHandle) -> Option<u8> {
    match storage.read_byte(slot, 0) {
        Ok(ERASED_BYTE) => None,
        Ok(raw) => Some(raw),
        Err(e) => {
            warn!("settings slot {} unreadable: {:?}", slot.offset(), e);
            None
        }
    }
}
