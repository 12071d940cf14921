// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A set of texture unit indices.

/// The largest number of texture units a context will ever track.
pub const MAX_TRACKED_UNITS: usize = 1024;

const WORDS: usize = MAX_TRACKED_UNITS / 64;

/// A fixed-size bit set of texture unit indices in `[0, MAX_TRACKED_UNITS)`.
///
/// Used as the reverse index from a texture to the units it is bound to, so
/// that deleting a texture only visits the units that actually hold it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitSet {
    bits: [u64; WORDS],
}

impl UnitSet {
    /// The empty set.
    pub const EMPTY: Self = Self { bits: [0; WORDS] };

    /// Creates an empty set.
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Adds `unit`. Returns `true` if it was not already present.
    ///
    /// Indices outside the tracked range are ignored.
    pub fn insert(&mut self, unit: u32) -> bool {
        let Some((word, mask)) = Self::locate(unit) else {
            return false;
        };
        let absent = self.bits[word] & mask == 0;
        self.bits[word] |= mask;
        absent
    }

    /// Removes `unit`. Returns `true` if it was present.
    pub fn remove(&mut self, unit: u32) -> bool {
        let Some((word, mask)) = Self::locate(unit) else {
            return false;
        };
        let present = self.bits[word] & mask != 0;
        self.bits[word] &= !mask;
        present
    }

    /// Checks if `unit` is in the set.
    pub const fn contains(&self, unit: u32) -> bool {
        let index = unit as usize;
        if index >= MAX_TRACKED_UNITS {
            return false;
        }
        self.bits[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Checks if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|word| *word == 0)
    }

    /// Returns the number of units in the set.
    pub fn len(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterates over the units in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.bits
            .iter()
            .enumerate()
            .flat_map(|(word_index, word)| {
                let base = (word_index * 64) as u32;
                let mut remaining = *word;
                std::iter::from_fn(move || {
                    if remaining == 0 {
                        return None;
                    }
                    let bit = remaining.trailing_zeros();
                    remaining &= remaining - 1;
                    Some(base + bit)
                })
            })
    }

    fn locate(unit: u32) -> Option<(usize, u64)> {
        let index = unit as usize;
        (index < MAX_TRACKED_UNITS).then(|| (index / 64, 1u64 << (index % 64)))
    }
}

impl Default for UnitSet {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Debug for UnitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<u32> for UnitSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut set = Self::new();
        for unit in iter {
            set.insert(unit);
        }
        set
    }
}
