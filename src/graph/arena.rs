//! Generational slot arena
//!
//! Nodes and edges are stored in arenas and referenced everywhere by small
//! copyable ids. An id carries the slot's generation at the time it was
//! handed out, so access through a stale id (the slot has since been freed
//! and possibly reused) is detected rather than silently returning the new
//! occupant.

use std::fmt;
use std::marker::PhantomData;

/// Typed handle into an [`Arena`].
///
/// The type parameter ties the id to the arena's element type so node ids
/// cannot be used to index the edge arena and vice versa.
pub struct SlotId<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SlotId<T> {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Raw slot index. Stable for the lifetime of the referenced record and
    /// used as the tie-breaking identity in edge ordering.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the slot had when this id was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

// Manual impls: `T` need not be Clone/Ord for the id to be.
impl<T> Clone for SlotId<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for SlotId<T> {}
impl<T> PartialEq for SlotId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}
impl<T> Eq for SlotId<T> {}
impl<T> PartialOrd for SlotId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for SlotId<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.index, self.generation).cmp(&(other.index, other.generation))
    }
}
impl<T> std::hash::Hash for SlotId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}
impl<T> fmt::Debug for SlotId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Growable arena with slot recycling and generation checking.
#[derive(Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Arena<T> {
    /// Empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.live
    }

    /// True if no records are live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Insert a record, reusing a freed slot when one is available.
    pub fn insert(&mut self, value: T) -> SlotId<T> {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            return SlotId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        SlotId::new(index, 0)
    }

    /// Shared access; `None` if the id is stale or the slot is free.
    pub fn get(&self, id: SlotId<T>) -> Option<&T> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Mutable access; `None` if the id is stale or the slot is free.
    pub fn get_mut(&mut self, id: SlotId<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Free a slot, bumping its generation so outstanding ids go stale.
    pub fn remove(&mut self, id: SlotId<T>) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.value.is_none() {
            return None;
        }
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        value
    }

    /// True if the id refers to a live record.
    pub fn contains(&self, id: SlotId<T>) -> bool {
        self.get(id).is_some()
    }

    /// Iterate over live records in slot-index order (deterministic).
    pub fn iter(&self) -> impl Iterator<Item = (SlotId<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (SlotId::new(i as u32, slot.generation), v))
        })
    }

    /// Live ids in slot-index order.
    pub fn ids(&self) -> Vec<SlotId<T>> {
        self.iter().map(|(id, _)| id).collect()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("live", &self.live)
            .field("capacity", &self.slots.len())
            .finish()
    }
}
