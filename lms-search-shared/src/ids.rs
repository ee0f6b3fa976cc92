//! Identifier helpers: the key bound used by catalogs and the skip set.

use std::collections::HashSet;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// An identifier that can be sent to and read back from the search engine.
///
/// Learning materials and courses use integer ids, mesh descriptors use
/// string ids; both satisfy this bound.
pub trait CatalogKey:
    Clone + Eq + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> CatalogKey for T where
    T: Clone + Eq + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Ids that are already freshly indexed and can be skipped.
///
/// A skip set only ever contains ids drawn from the candidate set it was
/// computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipSet<K: CatalogKey> {
    ids: HashSet<K>,
}

impl<K: CatalogKey> SkipSet<K> {
    /// A skip set that skips nothing.
    pub fn empty() -> Self {
        Self {
            ids: HashSet::new(),
        }
    }

    /// Keep only the `found` ids that are also in `candidates`.
    pub fn from_candidates(candidates: &[K], found: impl IntoIterator<Item = K>) -> Self {
        let candidates: HashSet<&K> = candidates.iter().collect();
        let ids = found
            .into_iter()
            .filter(|id| candidates.contains(id))
            .collect();
        Self { ids }
    }

    pub fn contains(&self, id: &K) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.ids.iter()
    }
}
