//! Index server: the shared tree, the identity map and id-subscriptions.
//!
//! `Server` owns every caller object stored in the index. Listeners created
//! from it place region markers into the same tree, and every mutation looks
//! those markers up to decide which listeners need a fresh snapshot.

use crate::compute::rect::Rect;
use crate::compute::validation::validate_id;
use crate::config::Config;
use crate::error::{GeoWatchError, Result};
use crate::spatial_index::{BranchParams, Entry, SafeRTree};
use crate::types::{Indexable, TypeFilter};
use log::{trace, warn};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rstar::RTreeParams;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use uuid::Uuid;

mod listener;
pub(crate) mod region;

pub use listener::{Batch, Listener};

use listener::{ListenerShared, Snapshot};
use region::RegionMarker;

static REGION_MARKERS: Lazy<TypeFilter> = Lazy::new(TypeFilter::region_markers);

/// Listeners touched by a single mutation, keyed by listener id.
type Affected = FxHashMap<Uuid, Arc<ListenerShared>>;

/// State guarded by the server lock.
#[derive(Default)]
pub(crate) struct Registry {
    /// Identity -> currently stored caller object
    objects: FxHashMap<String, Arc<dyn Indexable>>,
    /// Identity -> listeners subscribed to it regardless of region
    watchers: FxHashMap<String, FxHashMap<Uuid, Weak<ListenerShared>>>,
}

impl Registry {
    fn watch(&mut self, id: String, listener: &Arc<ListenerShared>) {
        self.watchers
            .entry(id)
            .or_default()
            .insert(listener.id(), Arc::downgrade(listener));
    }

    fn unwatch(&mut self, id: &str, listener_id: Uuid) -> bool {
        let Some(subscribers) = self.watchers.get_mut(id) else {
            return false;
        };
        let removed = subscribers.remove(&listener_id).is_some();
        if subscribers.is_empty() {
            self.watchers.remove(id);
        }
        removed
    }

    fn collect_watchers(&self, id: &str, affected: &mut Affected) {
        if let Some(subscribers) = self.watchers.get(id) {
            for listener in subscribers.values().filter_map(Weak::upgrade) {
                affected.entry(listener.id()).or_insert(listener);
            }
        }
    }
}

pub(crate) struct ServerInner {
    tree: SafeRTree,
    registry: RwLock<Registry>,
    marker_seq: AtomicU64,
    config: Config,
}

impl ServerInner {
    fn next_marker_id(&self) -> String {
        let n = self.marker_seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("bbx:{}", n)
    }

    fn insert_marker(&self, rect: Rect, listener: Weak<ListenerShared>) -> Arc<RegionMarker> {
        let marker = Arc::new(RegionMarker::new(self.next_marker_id(), rect, listener));
        self.tree.insert(Entry::Region(marker.clone()));
        marker
    }

    fn remove_marker(&self, marker: Arc<RegionMarker>) {
        let id = marker.id().to_string();
        if !self.tree.delete(&Entry::Region(marker)) {
            // concurrent teardown paths may race here
            warn!("region marker {} was already absent from the tree", id);
        }
    }

    /// Adds every live listener owning a marker that intersects `rect`.
    fn collect_listeners(&self, rect: &Rect, affected: &mut Affected) {
        for entry in self.tree.search_intersect(rect, Some(&REGION_MARKERS)) {
            if let Entry::Region(marker) = entry
                && let Some(listener) = marker.listener()
            {
                affected.entry(listener.id()).or_insert(listener);
            }
        }
    }

    /// Caller objects intersecting any of `rects`, deduplicated by identity.
    fn find_objects(
        &self,
        rects: &[Rect],
        filter: Option<&TypeFilter>,
    ) -> FxHashMap<String, Arc<dyn Indexable>> {
        let mut objects = FxHashMap::default();
        for rect in rects {
            for entry in self.tree.search_intersect(rect, filter) {
                if let Entry::Object(obj) = entry
                    && !obj.kind().is_reserved()
                {
                    objects.entry(obj.id().to_string()).or_insert(obj);
                }
            }
        }
        objects
    }

    /// Computes a listener snapshot: region results plus every watched id,
    /// the latter unfiltered and included even outside the region.
    fn collect(&self, snapshot: &Snapshot) -> Batch {
        let registry = self.registry.read();

        let mut objects = self.find_objects(&snapshot.rects, snapshot.types.as_ref());
        for id in &snapshot.watched {
            if let Some(obj) = registry.objects.get(id) {
                objects.insert(id.clone(), obj.clone());
            }
        }

        objects.into_values().collect()
    }
}

/// The main 2D index server.
///
/// Cloning a `Server` is cheap; clones share the same index.
///
/// # Examples
///
/// ```rust
/// use geowatch::{Indexable, IndexableType, MapBounds, Object, Server};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let server = Server::new(25, 50)?;
/// let mut listener = server.new_listener(100, Duration::from_millis(10))?;
/// listener.set_bounds(MapBounds::new(-10.0, -10.0, 10.0, 10.0))?;
///
/// let plane = Object::at("RF-350", IndexableType(1), 0.0, 0.0, 0.1, 0.1, None)?;
/// server.add(Arc::new(plane))?;
///
/// let batch = listener.updates().blocking_recv().unwrap();
/// assert_eq!(batch.len(), 1);
/// assert_eq!(batch[0].id(), "RF-350");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

impl Server {
    /// Creates a server with the given tree branching and default listener
    /// settings.
    ///
    /// The branching is validated and recorded in [`Config`], but it is
    /// advisory only: node capacity is fixed at compile time to
    /// `BranchParams` (25..50), and a warning is logged when the requested
    /// values differ.
    pub fn new(min_branch: usize, max_branch: usize) -> Result<Self> {
        Self::with_config(Config::default().with_branching(min_branch, max_branch))
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        if (config.min_branch, config.max_branch)
            != (BranchParams::MIN_SIZE, BranchParams::MAX_SIZE)
        {
            warn!(
                "requested branching {}..{} differs from the tree node capacity {}..{}",
                config.min_branch,
                config.max_branch,
                BranchParams::MIN_SIZE,
                BranchParams::MAX_SIZE
            );
        }

        Ok(Self {
            inner: Arc::new(ServerInner {
                tree: SafeRTree::new(),
                registry: RwLock::new(Registry::default()),
                marker_seq: AtomicU64::new(0),
                config,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Adds an object, replacing any object stored under the same identity.
    ///
    /// Every listener whose region intersects the previous or the new
    /// rectangle, and every listener subscribed to the identity, is marked
    /// dirty.
    pub fn add(&self, object: Arc<dyn Indexable>) -> Result<()> {
        validate_id(object.id())?;
        if object.kind().is_reserved() {
            return Err(GeoWatchError::ReservedType(object.kind().0));
        }

        let inner = &self.inner;
        let mut registry = inner.registry.write();
        let mut affected = Affected::default();

        if let Some(prev) = registry.objects.get(object.id()).cloned() {
            inner.collect_listeners(prev.bounds(), &mut affected);
            inner.tree.delete(&Entry::Object(prev));
        }

        inner.tree.insert(Entry::Object(object.clone()));
        registry
            .objects
            .insert(object.id().to_string(), object.clone());

        inner.collect_listeners(object.bounds(), &mut affected);
        registry.collect_watchers(object.id(), &mut affected);

        trace!(
            "add {}: marking {} listeners dirty",
            object.id(),
            affected.len()
        );
        for listener in affected.values() {
            listener.mark_dirty();
        }

        Ok(())
    }

    /// Removes the object stored under `id`. Returns `true` if it was present.
    pub fn remove(&self, id: &str) -> bool {
        let inner = &self.inner;
        let mut registry = inner.registry.write();

        let Some(obj) = registry.objects.remove(id) else {
            return false;
        };

        let mut affected = Affected::default();
        inner.collect_listeners(obj.bounds(), &mut affected);
        registry.collect_watchers(id, &mut affected);
        inner.tree.delete(&Entry::Object(obj));

        trace!("remove {}: marking {} listeners dirty", id, affected.len());
        for listener in affected.values() {
            listener.mark_dirty();
        }

        true
    }

    /// Creates a listener and starts its notifier thread.
    pub fn new_listener(&self, channel_capacity: usize, interval: Duration) -> Result<Listener> {
        Listener::spawn(self.inner.clone(), channel_capacity, interval)
    }

    /// Creates a listener using the configured channel capacity and interval.
    pub fn listener(&self) -> Result<Listener> {
        let config = &self.inner.config;
        self.new_listener(config.channel_capacity, config.notify_interval())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Indexable>> {
        self.inner.registry.read().objects.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.registry.read().objects.contains_key(id)
    }

    /// Number of caller objects in the index.
    pub fn len(&self) -> usize {
        self.inner.registry.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of listeners subscribed to `id`.
    pub fn subscriber_count(&self, id: &str) -> usize {
        self.inner
            .registry
            .read()
            .watchers
            .get(id)
            .map_or(0, |subscribers| subscribers.len())
    }

    /// Caller objects intersecting `rect`, optionally restricted by `filter`.
    /// Region markers are never returned.
    pub fn search(&self, rect: &Rect, filter: Option<&TypeFilter>) -> Vec<Arc<dyn Indexable>> {
        self.inner
            .tree
            .search_intersect(rect, filter)
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Object(obj) if !obj.kind().is_reserved() => Some(obj),
                _ => None,
            })
            .collect()
    }

    /// Tree search including region markers.
    #[cfg(test)]
    pub(crate) fn search_raw(
        &self,
        rect: &Rect,
        filter: Option<&TypeFilter>,
    ) -> Vec<Arc<dyn Indexable>> {
        self.inner
            .tree
            .search_intersect(rect, filter)
            .into_iter()
            .map(Entry::into_indexable)
            .collect()
    }

    /// Number of region markers currently in the tree, across all listeners.
    pub fn region_count(&self) -> usize {
        self.inner
            .tree
            .search_intersect(&Rect::WORLD, Some(&REGION_MARKERS))
            .len()
    }

    /// Caller objects intersecting any of `rects`, deduplicated by identity.
    /// Region markers are never returned.
    pub fn find_objects(
        &self,
        rects: &[Rect],
        filter: Option<&TypeFilter>,
    ) -> Vec<Arc<dyn Indexable>> {
        let _registry = self.inner.registry.read();
        self.inner
            .find_objects(rects, filter)
            .into_values()
            .collect()
    }
}
