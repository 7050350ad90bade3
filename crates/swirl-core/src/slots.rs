//! Generational slot table.
//!
//! Backs both device buffer ids and ABI pipeline handles. A key names a
//! slot index plus the generation the slot had when the value was
//! inserted; removing the value bumps the generation, so stale keys miss
//! instead of aliasing a newer value, and a second removal is a no-op.

/// Opaque key into a [`SlotTable`]: slot index in the upper 32 bits,
/// generation in the lower 32.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey(u64);

impl SlotKey {
    fn pack(slot: u32, generation: u32) -> Self {
        Self(((slot as u64) << 32) | generation as u64)
    }

    /// Slot index.
    pub fn slot(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Generation the slot had when this key was issued.
    pub fn generation(self) -> u32 {
        self.0 as u32
    }

    /// Raw `u64` form for crossing the C ABI.
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Rebuild a key from its raw form. Invalid keys simply miss on lookup.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Values addressed by generational [`SlotKey`]s with slot reuse.
pub struct SlotTable<T> {
    entries: Vec<Entry<T>>,
    vacant: Vec<u32>,
    live: usize,
}

impl<T> SlotTable<T> {
    /// An empty table. `const` so it can back a `static`.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            vacant: Vec::new(),
            live: 0,
        }
    }

    /// Store a value, reusing a vacant slot when one exists.
    pub fn insert(&mut self, value: T) -> SlotKey {
        self.live += 1;
        if let Some(slot) = self.vacant.pop() {
            let entry = &mut self.entries[slot as usize];
            entry.value = Some(value);
            return SlotKey::pack(slot, entry.generation);
        }
        let slot = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        SlotKey::pack(slot, 0)
    }

    fn entry(&self, key: SlotKey) -> Option<&Entry<T>> {
        self.entries
            .get(key.slot() as usize)
            .filter(|e| e.generation == key.generation())
    }

    /// Shared access to a live value.
    pub fn get(&self, key: SlotKey) -> Option<&T> {
        self.entry(key)?.value.as_ref()
    }

    /// Exclusive access to a live value.
    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        self.entries
            .get_mut(key.slot() as usize)
            .filter(|e| e.generation == key.generation())?
            .value
            .as_mut()
    }

    /// Whether `key` refers to a live value.
    pub fn contains(&self, key: SlotKey) -> bool {
        self.get(key).is_some()
    }

    /// Take a value out, invalidating `key` and every copy of it.
    ///
    /// A slot whose generation wraps to zero is retired for good, since
    /// reusing it would let keys from its first generation match again.
    pub fn remove(&mut self, key: SlotKey) -> Option<T> {
        let entry = self
            .entries
            .get_mut(key.slot() as usize)
            .filter(|e| e.generation == key.generation())?;
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        if entry.generation != 0 {
            self.vacant.push(key.slot());
        }
        self.live -= 1;
        Some(value)
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no value is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live values with their keys, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        self.entries.iter().enumerate().filter_map(|(slot, e)| {
            e.value
                .as_ref()
                .map(|v| (SlotKey::pack(slot as u32, e.generation), v))
        })
    }
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
