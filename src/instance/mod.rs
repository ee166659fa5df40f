//! Instance table mapping C-visible integer ids to façade handles.
//!
//! An id packs a slot index and the slot's generation:
//!
//! ```text
//!  bit 31   30 ............ 10   9 ....... 0
//!  [ 0 ]  [   generation      ] [  index   ]
//! ```
//!
//! Removing an instance bumps its slot generation, so a stale copy of a
//! destroyed id never resolves to the handle that later reuses the slot.

use crate::error::{Error, Result};
use crate::observability::record_instance_slots_used;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Fixed number of slots.
pub const INSTANCE_CAPACITY: usize = 1024;

const INDEX_BITS: u32 = 10;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
/// Generation bits that fit below the sign bit.
const GENERATION_MASK: u32 = (i32::MAX as u32) >> INDEX_BITS;

/// Externally visible instance id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct InstanceId(i32);

impl InstanceId {
    /// Sentinel for "no instance". Destroyed ids are reset to it.
    pub const INVALID: Self = Self(-1);

    /// Wrap a raw id received over the C ABI.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw id for the C ABI.
    pub const fn as_raw(&self) -> i32 {
        self.0
    }

    /// Returns true unless the id is negative.
    pub const fn is_valid(&self) -> bool {
        self.0 >= 0
    }

    const fn compose(index: usize, generation: u32) -> Self {
        Self((((generation & GENERATION_MASK) << INDEX_BITS) | (index as u32 & INDEX_MASK)) as i32)
    }

    const fn index(&self) -> usize {
        (self.0 as u32 & INDEX_MASK) as usize
    }

    const fn generation(&self) -> u32 {
        (self.0 as u32) >> INDEX_BITS
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "InstanceId({}v{})", self.index(), self.generation())
        } else {
            f.write_str("InstanceId(invalid)")
        }
    }
}

struct Slot<T> {
    generation: u32,
    handle: Option<T>,
}

struct TableState<T> {
    slots: Vec<Slot<T>>,
    /// Index of the most recently allocated slot.
    last: usize,
    used: usize,
}

/// Fixed-capacity table of shared handles.
///
/// All three operations hold one mutex for their whole body and never call
/// out while holding it.
pub struct InstanceTable<T> {
    state: Mutex<TableState<T>>,
}

impl<T: Clone> InstanceTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        let slots = (0..INSTANCE_CAPACITY)
            .map(|_| Slot {
                generation: 0,
                handle: None,
            })
            .collect();
        Self {
            state: Mutex::new(TableState {
                slots,
                last: INSTANCE_CAPACITY - 1,
                used: 0,
            }),
        }
    }

    /// Store `handle` in the first free slot after the last allocated one.
    ///
    /// Fails with [`Error::InstanceTableFull`] once every slot is taken.
    pub fn new_instance_id(&self, handle: T) -> Result<InstanceId> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let start = state.last;
        for step in 1..=INSTANCE_CAPACITY {
            let index = (start + step) % INSTANCE_CAPACITY;
            let slot = &mut state.slots[index];
            if slot.handle.is_none() {
                slot.handle = Some(handle);
                let id = InstanceId::compose(index, slot.generation);
                state.last = index;
                state.used += 1;
                record_instance_slots_used(state.used);
                return Ok(id);
            }
        }
        tracing::error!("instance table full ({} slots)", INSTANCE_CAPACITY);
        Err(Error::InstanceTableFull)
    }

    /// The handle behind `id`, if `id` is live.
    pub fn get_instance(&self, id: InstanceId) -> Option<T> {
        if !id.is_valid() {
            return None;
        }
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = &state.slots[id.index()];
        if slot.generation != id.generation() {
            return None;
        }
        slot.handle.clone()
    }

    /// Release the slot behind `id` and reset `id` to [`InstanceId::INVALID`].
    ///
    /// Returns the table's reference to the handle so the caller decides
    /// where it drops.
    pub fn remove_instance_reference(&self, id: &mut InstanceId) -> Result<T> {
        if !id.is_valid() {
            return Err(Error::InvalidInstance(id.as_raw()));
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = &mut state.slots[id.index()];
        if slot.generation != id.generation() {
            return Err(Error::InvalidInstance(id.as_raw()));
        }
        let Some(handle) = slot.handle.take() else {
            return Err(Error::InvalidInstance(id.as_raw()));
        };
        slot.generation = (slot.generation + 1) & GENERATION_MASK;
        state.used -= 1;
        record_instance_slots_used(state.used);
        *id = InstanceId::INVALID;
        Ok(handle)
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).used
    }

    /// Returns true if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of slots.
    pub const fn capacity(&self) -> usize {
        INSTANCE_CAPACITY
    }
}

impl<T: Clone> Default for InstanceTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for InstanceTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.state.lock().unwrap_or_else(PoisonError::into_inner).used;
        f.debug_struct("InstanceTable")
            .field("used", &used)
            .field("capacity", &INSTANCE_CAPACITY)
            .finish()
    }
}
