//! A generation-checked arena.
//!
//! An `Arena` stores values in a contiguous array and hands out [`Key`]s
//! that remain small and reusable. Each slot carries a generation counter
//! that is bumped on removal, so a key held past its entry's lifetime is
//! *detected* rather than silently resolving to whatever value reused the
//! slot.
//!
//! This is the backbone of the runtime's bookkeeping: task identities and
//! reactor watches are arena keys, and "resume of a stale task" or
//! "cancellation of an already-fired watch" degrade to safe no-ops because
//! the generation no longer matches.

/// A stable handle into an [`Arena`].
///
/// A key pairs the slot index with the generation observed at insertion
/// time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct Key {
    /// Slot index inside the arena.
    index: u32,

    /// Generation of the slot when the value was inserted.
    generation: u32,
}

/// One arena slot: the current generation plus the value, if occupied.
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A slab-style arena with generation-checked access.
pub(crate) struct Arena<T> {
    /// Storage for slots; freed slots stay allocated for reuse.
    slots: Vec<Slot<T>>,

    /// Stack of free slot indices that can be reused.
    free: Vec<u32>,

    /// Number of occupied slots.
    len: usize,
}

impl<T> Arena<T> {
    /// Creates an arena with a fixed initial capacity.
    pub(crate) fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 1,
                value: None,
            })
            .collect::<Vec<_>>();
        let free = (0..capacity as u32).rev().collect();

        Self {
            slots,
            free,
            len: 0,
        }
    }

    /// Inserts a value and returns its key.
    ///
    /// A free slot is reused when available; otherwise the arena grows.
    pub(crate) fn insert(&mut self, value: T) -> Key {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 1,
                    value: None,
                });
                index
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.value = Some(value);
        self.len += 1;

        Key {
            index,
            generation: slot.generation,
        }
    }

    /// Removes and returns the value at `key`.
    ///
    /// Returns `None` when the key is stale or the slot is empty. On
    /// removal the slot's generation is bumped, invalidating every
    /// outstanding key for it.
    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;

        Some(value)
    }

    /// Returns a reference to the value at `key`, if it is still live.
    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Returns a mutable reference to the value at `key`, if still live.
    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Number of live entries.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no live entries.
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }
}
