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

//! Dependency tracking between composite objects and the objects they use.

use smallvec::SmallVec;
use std::collections::HashSet;
use std::hash::Hash;

/// The set of simpler objects a composite object currently depends on.
///
/// A composite may refer to the same dependency from several places (two
/// vertex attributes fed by one interleaved buffer, for example), so the
/// container counts references. A dependency stays present until every
/// reference to it has been removed, while [`references`](Self::references)
/// only ever reports a set.
#[derive(Debug, Clone)]
pub struct ReferenceContainer<R> {
    entries: SmallVec<[(R, usize); 8]>,
}

impl<R> Default for ReferenceContainer<R> {
    fn default() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }
}

impl<R: Copy + Eq + Hash> ReferenceContainer<R> {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    /// Records one more reference to `dependency`.
    ///
    /// Returns `true` if `dependency` was not referenced before this call.
    pub fn add(&mut self, dependency: R) -> bool {
        match self.entries.iter_mut().find(|(r, _)| *r == dependency) {
            Some((_, count)) => {
                *count += 1;
                false
            }
            None => {
                self.entries.push((dependency, 1));
                true
            }
        }
    }

    /// Drops one reference to `dependency`. Removing an absent dependency is a no-op.
    ///
    /// Returns `true` if this call removed the last reference.
    pub fn remove(&mut self, dependency: R) -> bool {
        let Some(position) = self.entries.iter().position(|(r, _)| *r == dependency) else {
            return false;
        };
        let count = &mut self.entries[position].1;
        *count -= 1;
        if *count == 0 {
            self.entries.swap_remove(position);
            true
        } else {
            false
        }
    }

    /// Drops every reference to `dependency`, returning how many there were.
    pub fn remove_all(&mut self, dependency: R) -> usize {
        match self.entries.iter().position(|(r, _)| *r == dependency) {
            Some(position) => self.entries.swap_remove(position).1,
            None => 0,
        }
    }

    /// Returns `true` if at least one reference to `dependency` exists.
    pub fn contains(&self, dependency: &R) -> bool {
        self.entries.iter().any(|(r, _)| r == dependency)
    }

    /// Returns how many references to `dependency` exist.
    pub fn count(&self, dependency: &R) -> usize {
        self.entries
            .iter()
            .find(|(r, _)| r == dependency)
            .map_or(0, |(_, count)| *count)
    }

    /// Returns a snapshot of the distinct dependencies.
    pub fn references(&self) -> HashSet<R> {
        self.entries.iter().map(|(r, _)| *r).collect()
    }

    /// Iterates over the distinct dependencies.
    pub fn iter(&self) -> impl Iterator<Item = R> + '_ {
        self.entries.iter().map(|(r, _)| *r)
    }

    /// Returns the number of distinct dependencies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is referenced.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every dependency, returning the distinct ones that were present.
    pub fn clear(&mut self) -> Vec<R> {
        self.entries.drain(..).map(|(r, _)| r).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_reports_first_reference_only() {
        let mut refs = ReferenceContainer::new();
        assert!(refs.add(1u32));
        assert!(!refs.add(1));
        assert!(refs.add(2));
        assert_eq!(refs.len(), 2);
        assert_eq!(refs.count(&1), 2);
    }

    #[test]
    fn test_remove_tracks_multiplicity() {
        let mut refs = ReferenceContainer::new();
        refs.add(1u32);
        refs.add(1);

        assert!(!refs.remove(1), "one reference remains");
        assert!(refs.contains(&1));
        assert!(refs.remove(1), "last reference removed");
        assert!(!refs.contains(&1));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut refs: ReferenceContainer<u32> = ReferenceContainer::new();
        assert!(!refs.remove(9));
        assert!(refs.is_empty());
        assert_eq!(refs.remove_all(9), 0);
    }

    #[test]
    fn test_references_is_a_set() {
        let mut refs = ReferenceContainer::new();
        refs.add(3u32);
        refs.add(3);
        refs.add(4);

        let snapshot = refs.references();
        assert_eq!(snapshot, HashSet::from([3, 4]));
        assert_eq!(refs.remove_all(3), 2);
        assert_eq!(refs.references(), HashSet::from([4]));
    }
}
