//! Slot+generation table backing pinned object handles.
//!
//! A handle must fit in a native pointer and must never be zero, so the
//! slot index is stored off by one in the upper half of a `usize` and the
//! generation in the lower half. Released handles carry a stale
//! generation and resolve to `None`.

const HALF: u32 = usize::BITS / 2;
const GEN_MASK: usize = (1 << HALF) - 1;

fn encode(slot: usize, generation: usize) -> usize {
    ((slot + 1) << HALF) | (generation & GEN_MASK)
}

fn decode(handle: usize) -> Option<(usize, usize)> {
    let tagged = handle >> HALF;
    if tagged == 0 {
        return None;
    }
    Some((tagged - 1, handle & GEN_MASK))
}

struct Slot<T> {
    generation: usize,
    data: Option<T>,
}

/// Maps nonzero `usize` handles to owned values, reusing freed slots.
pub(crate) struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<usize>,
}

impl<T> HandleTable<T> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: T) -> usize {
        if let Some(slot_idx) = self.free_list.pop() {
            let slot = &mut self.slots[slot_idx];
            slot.data = Some(value);
            encode(slot_idx, slot.generation)
        } else {
            let slot_idx = self.slots.len();
            self.slots.push(Slot {
                generation: 0,
                data: Some(value),
            });
            encode(slot_idx, 0)
        }
    }

    /// `None` for stale, zero, or never-issued handles.
    pub fn get(&self, handle: usize) -> Option<&T> {
        let (slot_idx, generation) = decode(handle)?;
        let slot = self.slots.get(slot_idx)?;
        if slot.generation != generation {
            return None;
        }
        slot.data.as_ref()
    }

    /// Removing twice is a no-op that returns `None`.
    ///
    /// A slot whose generation wraps back to zero is retired instead of
    /// recycled, so handles from its first epoch can never resolve again.
    pub fn remove(&mut self, handle: usize) -> Option<T> {
        let (slot_idx, generation) = decode(handle)?;
        let slot = self.slots.get_mut(slot_idx)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.data.take()?;
        slot.generation = (slot.generation + 1) & GEN_MASK;
        if slot.generation != 0 {
            self.free_list.push(slot_idx);
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.data.is_some()).count()
    }
}
