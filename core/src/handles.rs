use std::sync::atomic::{AtomicU16, Ordering};

use crate::errors::ResourceError;

static NEXT_OWNER: AtomicU16 = AtomicU16::new(1);

/// Opaque reference to a value in a [`HandleTable`]
///
/// Packs the owning table, the slot generation and the slot index, so a handle
/// to a released value or from another table is detected instead of reaching
/// whatever took its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    fn new(owner: u16, generation: u16, index: u32) -> Handle {
        Handle(((owner as u64) << 48) | ((generation as u64) << 32) | index as u64)
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Handle {
        Handle(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    fn owner(self) -> u16 {
        (self.0 >> 48) as u16
    }

    #[inline]
    fn generation(self) -> u16 {
        (self.0 >> 32) as u16
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as u32 as usize
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u16,
    value: Option<T>,
}

/// Slab of values addressed by generation-checked [`Handle`]s
#[derive(Debug)]
pub struct HandleTable<T> {
    owner: u16,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,

    /// Slots whose generations ran out, never reused
    retired: usize,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        HandleTable::new()
    }
}

impl<T> HandleTable<T> {
    pub fn new() -> HandleTable<T> {
        // owner 0 is never handed out, a zero handle is always stale
        let mut owner = NEXT_OWNER.fetch_add(1, Ordering::Relaxed);
        if owner == 0 {
            owner = NEXT_OWNER.fetch_add(1, Ordering::Relaxed);
        }

        HandleTable {
            owner,
            slots: Vec::new(),
            free: Vec::new(),
            retired: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> Handle {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.value = Some(value);
                Handle::new(self.owner, slot.generation, index)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 1,
                    value: Some(value),
                });
                Handle::new(self.owner, 1, index)
            }
        }
    }

    fn slot(&self, handle: Handle) -> Option<&Slot<T>> {
        if handle.owner() != self.owner {
            return None;
        }
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation())
    }

    pub fn get(&self, handle: Handle) -> Result<&T, ResourceError> {
        self.slot(handle)
            .and_then(|slot| slot.value.as_ref())
            .ok_or(ResourceError::StaleHandle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T, ResourceError> {
        if self.slot(handle).is_none() {
            return Err(ResourceError::StaleHandle);
        }
        self.slots[handle.index()]
            .value
            .as_mut()
            .ok_or(ResourceError::StaleHandle)
    }

    /// Release the value; the handle and all copies of it become stale
    pub fn remove(&mut self, handle: Handle) -> Result<T, ResourceError> {
        if self.slot(handle).is_none() {
            return Err(ResourceError::StaleHandle);
        }

        let index = handle.index();
        let slot = &mut self.slots[index];
        let value = slot.value.take().ok_or(ResourceError::StaleHandle)?;
        // a wrapped generation would revive old handles to this slot
        match slot.generation.checked_add(1) {
            Some(generation) => {
                slot.generation = generation;
                self.free.push(index as u32);
            }
            None => self.retired += 1,
        }
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len() - self.retired
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
