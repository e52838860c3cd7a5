//! Thread-safe R*-tree shared by the server and its listeners.
//!
//! The tree holds two kinds of entries: caller objects and listener region
//! markers. Both are reference counted so the same entity can be found by
//! spatial search and by identity, and deletion compares entries by pointer
//! identity rather than by value.

use crate::compute::rect::Rect;
use crate::db::region::RegionMarker;
use crate::types::{Indexable, IndexableType, TypeFilter};
use parking_lot::RwLock;
use rstar::{AABB, RStarInsertionStrategy, RTree, RTreeObject, RTreeParams};
use std::sync::Arc;

/// Node capacity of the underlying R*-tree.
///
/// rstar fixes node sizes at the type level, so these are the bounds every
/// server uses regardless of the branching requested at runtime.
pub struct BranchParams;

impl RTreeParams for BranchParams {
    const MIN_SIZE: usize = 25;
    const MAX_SIZE: usize = 50;
    const REINSERTION_COUNT: usize = 10;
    type DefaultInsertionStrategy = RStarInsertionStrategy;
}

/// An entity stored in the tree.
#[derive(Debug, Clone)]
pub enum Entry {
    Object(Arc<dyn Indexable>),
    Region(Arc<RegionMarker>),
}

impl Entry {
    pub fn as_indexable(&self) -> &dyn Indexable {
        match self {
            Entry::Object(obj) => obj.as_ref(),
            Entry::Region(marker) => marker.as_ref(),
        }
    }

    pub fn kind(&self) -> IndexableType {
        self.as_indexable().kind()
    }

    pub fn into_indexable(self) -> Arc<dyn Indexable> {
        match self {
            Entry::Object(obj) => obj,
            Entry::Region(marker) => marker as Arc<dyn Indexable>,
        }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Entry::Object(a), Entry::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Entry::Region(a), Entry::Region(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl RTreeObject for Entry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.as_indexable().bounds().envelope()
    }
}

/// R*-tree guarded by a single reader/writer lock.
///
/// Mutations take the write lock and searches the read lock, so any number
/// of searches run together but never observe a partially applied mutation.
pub struct SafeRTree {
    tree: RwLock<RTree<Entry, BranchParams>>,
}

impl SafeRTree {
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(RTree::new_with_params()),
        }
    }

    pub fn insert(&self, entry: Entry) {
        self.tree.write().insert(entry);
    }

    /// Removes `entry` and returns `true` if that exact entity was present.
    pub fn delete(&self, entry: &Entry) -> bool {
        self.tree.write().remove(entry).is_some()
    }

    /// Returns entries intersecting `rect`, optionally restricted to the
    /// type tags accepted by `filter`.
    pub fn search_intersect(&self, rect: &Rect, filter: Option<&TypeFilter>) -> Vec<Entry> {
        let tree = self.tree.read();
        tree.locate_in_envelope_intersecting(&rect.envelope())
            .filter(|entry| filter.is_none_or(|f| f.matches(entry.kind())))
            .cloned()
            .collect()
    }
}

impl Default for SafeRTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Object;
    use std::thread;

    fn object(id: &str, kind: i32, lat: f64, lng: f64) -> Arc<dyn Indexable> {
        Arc::new(Object::at(id, IndexableType(kind), lat, lng, 0.1, 0.1, None).unwrap())
    }

    fn world() -> Rect {
        Rect::from_corners([-90.0, -180.0], [90.0, 180.0]).unwrap()
    }

    #[test]
    fn test_insert_search_delete() {
        let tree = SafeRTree::new();
        let obj = object("obj1", 1, 0.0, 0.0);
        tree.insert(Entry::Object(obj.clone()));

        let query = Rect::new([-1.0, -1.0], [2.0, 2.0]).unwrap();
        let found = tree.search_intersect(&query, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].as_indexable().id(), "obj1");

        assert!(tree.delete(&Entry::Object(obj.clone())));
        assert!(!tree.delete(&Entry::Object(obj)));
        assert!(tree.search_intersect(&world(), None).is_empty());
    }

    #[test]
    fn test_delete_compares_identity_not_value() {
        let tree = SafeRTree::new();
        let stored = object("obj1", 1, 0.0, 0.0);
        let lookalike = object("obj1", 1, 0.0, 0.0);
        tree.insert(Entry::Object(stored.clone()));

        assert!(!tree.delete(&Entry::Object(lookalike)));
        assert_eq!(tree.search_intersect(&world(), None).len(), 1);
        assert!(tree.delete(&Entry::Object(stored)));
    }

    #[test]
    fn test_search_with_type_filter() {
        let tree = SafeRTree::new();
        tree.insert(Entry::Object(object("a", 1, 0.0, 0.0)));
        tree.insert(Entry::Object(object("b", 2, 0.1, 0.1)));

        let only_one = TypeFilter::new([IndexableType(1)]);
        let found = tree.search_intersect(&world(), Some(&only_one));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].as_indexable().id(), "a");

        let markers = tree.search_intersect(&world(), Some(&TypeFilter::region_markers()));
        assert!(markers.is_empty());
    }

    #[test]
    fn test_concurrent_inserts_and_searches() {
        let tree = Arc::new(SafeRTree::new());

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let tree = tree.clone();
                thread::spawn(move || {
                    for j in 0..100 {
                        let id = format!("obj_{}_{}", i, j);
                        tree.insert(Entry::Object(object(&id, 1, i as f64, j as f64 * 0.5)));
                    }
                })
            })
            .collect();

        let reader = {
            let tree = tree.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let found = tree.search_intersect(&world(), None);
                    assert!(found.len() <= 400);
                }
            })
        };

        for h in writers {
            h.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(tree.search_intersect(&world(), None).len(), 400);
    }
}
