// Copyright 2024 OctoFHIR Team
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

//! Per-resolver member cache

use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Concurrent, additive-only cache owned by one resolver instance.
///
/// Concurrent misses may both compute an entry; the last insert wins and
/// both entries are equivalent.
pub(crate) struct MemberCache<K, V> {
    label: &'static str,
    entries: DashMap<K, V>,
}

impl<K: Eq + Hash + fmt::Debug, V: Clone> MemberCache<K, V> {
    pub(crate) fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: DashMap::new(),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub(crate) fn insert(&self, key: K, value: V) {
        log::trace!("{} cache insert {:?}", self.label, key);
        self.entries.insert(key, value);
    }

    pub(crate) fn get_or_try_insert<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<Option<V>, E>,
    ) -> Result<Option<V>, E> {
        if let Some(hit) = self.get(&key) {
            return Ok(Some(hit));
        }
        let computed = compute()?;
        if let Some(value) = &computed {
            self.insert(key, value.clone());
        }
        Ok(computed)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K: Eq + Hash, V> fmt::Debug for MemberCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberCache")
            .field("label", &self.label)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Cache key for a member looked up on a class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MemberKey {
    pub(crate) class: Arc<str>,
    pub(crate) name: Arc<str>,
    pub(crate) is_static: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_results_are_not_cached() {
        let cache: MemberCache<&str, u32> = MemberCache::new("test");
        let miss: Result<Option<u32>, ()> = cache.get_or_try_insert("a", || Ok(None));
        assert_eq!(miss, Ok(None));
        assert_eq!(cache.len(), 0);
        let hit: Result<Option<u32>, ()> = cache.get_or_try_insert("a", || Ok(Some(3)));
        assert_eq!(hit, Ok(Some(3)));
        let cached: Result<Option<u32>, ()> = cache.get_or_try_insert("a", || Err(()));
        assert_eq!(cached, Ok(Some(3)));
    }
}
