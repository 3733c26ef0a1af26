//! Host-owned registry of live screen instances.
//!
//! Pager-like host constructs refer to screens through a [`ScreenKey`]
//! instead of holding the instance itself. A key carries the generation of
//! its slot, so a key that outlived its screen (removed, or the whole arena
//! cleared on teardown) simply resolves to nothing.

use std::fmt;

/// Stable handle to a screen in a [`ScreenArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenKey {
    index: usize,
    generation: u32,
}

impl ScreenKey {
    /// Slot index.
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for ScreenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational arena of screens.
///
/// # Example
///
/// ```
/// use canvas_navigator::arena::ScreenArena;
///
/// let mut arena = ScreenArena::new();
/// let key = arena.insert("grades");
/// assert_eq!(arena.get(key), Some(&"grades"));
///
/// arena.clear();
/// assert_eq!(arena.get(key), None);
/// ```
#[derive(Debug)]
pub struct ScreenArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> ScreenArena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Store a screen and return its key. Freed slots are reused first.
    pub fn insert(&mut self, value: T) -> ScreenKey {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.value = Some(value);
            return ScreenKey {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        ScreenKey {
            index,
            generation: 0,
        }
    }

    /// Look up a live screen.
    pub fn get(&self, key: ScreenKey) -> Option<&T> {
        self.slots
            .get(key.index)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Look up a live screen mutably.
    pub fn get_mut(&mut self, key: ScreenKey) -> Option<&mut T> {
        self.slots
            .get_mut(key.index)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Remove a screen. Its key, and any copy of it, goes stale.
    pub fn remove(&mut self, key: ScreenKey) -> Option<T> {
        let slot = self
            .slots
            .get_mut(key.index)
            .filter(|slot| slot.generation == key.generation)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;
        Some(value)
    }

    /// Remove every screen; all outstanding keys go stale.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
        }
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for ScreenArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
