//! Stable-index object registry: offset 1..capacity, offset 0 reserved and
//! always empty. Offsets are stable for the lifetime of a present entry and
//! may be reused (in FIFO order, oldest-removed-first) once removed.

use crate::free_queue::FreeOffsetQueue;

pub struct StableIndexRegistry<T> {
    slots: Vec<Option<T>>,
    free: FreeOffsetQueue,
    /// High-water mark: the next offset to hand out once the free list is
    /// exhausted.
    high_water: usize,
}

impl<T> StableIndexRegistry<T> {
    pub fn new(initial_capacity: usize) -> Self {
        let capacity = initial_capacity.max(2).next_power_of_two();
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            free: FreeOffsetQueue::new(),
            high_water: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Inserts `value`, returning its offset. Prefers the oldest freed
    /// offset over extending into fresh space.
    pub fn add(&mut self, value: T) -> usize {
        let offset = match self.free.dequeue() {
            0 => {
                if self.high_water >= self.slots.len() {
                    self.grow();
                }
                let offset = self.high_water;
                self.high_water += 1;
                offset
            }
            reused => reused,
        };
        self.slots[offset] = Some(value);
        offset
    }

    pub fn is_valid(&self, offset: usize) -> bool {
        offset != 0 && offset < self.slots.len() && self.slots[offset].is_some()
    }

    pub fn get(&self, offset: usize) -> Option<&T> {
        if offset == 0 {
            return None;
        }
        self.slots.get(offset).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, offset: usize) -> Option<&mut T> {
        if offset == 0 {
            return None;
        }
        self.slots.get_mut(offset).and_then(|slot| slot.as_mut())
    }

    /// Removes the entry at `offset`, returning it. A no-op (returns
    /// `None`) if `offset` is not currently valid.
    pub fn remove(&mut self, offset: usize) -> Option<T> {
        if !self.is_valid(offset) {
            return None;
        }
        let value = self.slots[offset].take();
        self.free.enqueue(offset);
        value
    }

    /// Iterates over `(offset, &value)` for every currently present entry,
    /// in offset order. Used by broadcast and orphan auditing.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(offset, slot)| slot.as_ref().map(|value| (offset, value)))
    }

    fn grow(&mut self) {
        let new_capacity = self.slots.len() * 2;
        self.slots.resize_with(new_capacity, || None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_zero_is_never_valid_or_returned() {
        let mut reg: StableIndexRegistry<u32> = StableIndexRegistry::new(4);
        assert!(!reg.is_valid(0));
        let a = reg.add(10);
        assert_ne!(a, 0);
    }

    #[test]
    fn offsets_are_reused_in_fifo_order() {
        let mut reg: StableIndexRegistry<u32> = StableIndexRegistry::new(4);
        let a = reg.add(1);
        let b = reg.add(2);
        let _c = reg.add(3);
        reg.remove(a);
        reg.remove(b);
        let reused_a = reg.add(4);
        let reused_b = reg.add(5);
        assert_eq!(reused_a, a);
        assert_eq!(reused_b, b);
    }

    #[test]
    fn remove_of_invalid_offset_is_noop() {
        let mut reg: StableIndexRegistry<u32> = StableIndexRegistry::new(4);
        assert_eq!(reg.remove(999), None);
        assert_eq!(reg.remove(0), None);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut reg: StableIndexRegistry<u32> = StableIndexRegistry::new(2);
        let mut offsets = Vec::new();
        for i in 0..40 {
            offsets.push(reg.add(i));
        }
        assert!(reg.capacity() >= 40);
        for (i, offset) in offsets.iter().enumerate() {
            assert_eq!(reg.get(*offset), Some(&(i as u32)));
        }
    }

    #[test]
    fn iter_skips_removed_and_slot_zero() {
        let mut reg: StableIndexRegistry<u32> = StableIndexRegistry::new(4);
        let a = reg.add(1);
        let _b = reg.add(2);
        reg.remove(a);
        let present: Vec<_> = reg.iter().map(|(offset, value)| (offset, *value)).collect();
        assert_eq!(present, vec![(2, 2)]);
    }
}
