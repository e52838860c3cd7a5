//! Listeners: live subscriptions over a region and/or a set of identities.
//!
//! Each listener runs a notifier thread that wakes on a fixed interval. Index
//! mutations only flip the listener's dirty flag; the notifier recomputes the
//! full snapshot on its next tick and sends it as one batch, so bursts of
//! mutations between ticks collapse into a single update.

use super::ServerInner;
use crate::compute::bounds::MapBounds;
use crate::compute::rect::Rect;
use crate::compute::validation::validate_listener_params;
use crate::error::Result;
use crate::types::{Indexable, IndexableType, TypeFilter};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::region::RegionMarker;

/// One emitted snapshot: every object currently matching the listener.
/// Order is unspecified.
pub type Batch = Vec<Arc<dyn Indexable>>;

struct ListenerState {
    markers: Vec<Arc<RegionMarker>>,
    types: Option<TypeFilter>,
    watched: FxHashSet<String>,
    dirty: bool,
    stopped: bool,
}

/// What the notifier has to compute on a dirty tick.
pub(crate) struct Snapshot {
    pub(crate) rects: Vec<Rect>,
    pub(crate) watched: Vec<String>,
    pub(crate) types: Option<TypeFilter>,
}

enum Tick {
    Stopped,
    Idle,
    Emit(Snapshot),
}

/// Listener state shared between the handle, the notifier thread and the
/// server (which only ever holds it weakly).
pub(crate) struct ListenerShared {
    id: Uuid,
    interval: Duration,
    server: Arc<ServerInner>,
    state: Mutex<ListenerState>,
}

impl ListenerShared {
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn mark_dirty(&self) {
        let mut state = self.state.lock();
        if !state.stopped {
            state.dirty = true;
            trace!("listener {} marked dirty", self.id);
        }
    }

    /// Clears the dirty flag and captures what to query. The flag is cleared
    /// before the query runs, so a mutation landing meanwhile re-marks it and
    /// is picked up on the following tick.
    fn tick(&self) -> Tick {
        let mut state = self.state.lock();
        if state.stopped {
            return Tick::Stopped;
        }
        if !state.dirty {
            return Tick::Idle;
        }
        state.dirty = false;

        Tick::Emit(Snapshot {
            rects: state.markers.iter().map(|m| *m.bounds()).collect(),
            watched: state.watched.iter().cloned().collect(),
            types: state.types.clone(),
        })
    }

    fn stop(&self) {
        let mut registry = self.server.registry.write();
        let mut state = self.state.lock();
        if state.stopped {
            return;
        }
        state.stopped = true;
        state.dirty = false;

        for marker in state.markers.drain(..) {
            self.server.remove_marker(marker);
        }
        for id in state.watched.drain() {
            registry.unwatch(&id, self.id);
        }

        debug!("listener {} stopped", self.id);
    }

    fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    /// Computes and sends one snapshot. Returns `false` once the notifier
    /// should exit.
    fn emit(&self, snapshot: Snapshot, tx: &mpsc::Sender<Batch>) -> bool {
        let batch = self.server.collect(&snapshot);

        // stop may have landed while the snapshot was computed
        if self.is_stopped() {
            return false;
        }

        trace!("listener {} emitting {} objects", self.id, batch.len());
        if tx.blocking_send(batch).is_err() {
            warn!("listener {} receiver dropped, stopping", self.id);
            self.stop();
            return false;
        }
        true
    }

    fn run(self: Arc<Self>, tx: mpsc::Sender<Batch>) {
        loop {
            thread::sleep(self.interval);

            match self.tick() {
                Tick::Stopped => break,
                Tick::Idle => continue,
                Tick::Emit(snapshot) => {
                    if !self.emit(snapshot, &tx) {
                        break;
                    }
                }
            }
        }

        // dropping `tx` closes the update channel
        debug!("listener {} notifier exited", self.id);
    }
}

/// A live subscription created by [`Server::new_listener`](super::Server::new_listener).
///
/// A listener watches a region (set with [`set_bounds`](Self::set_bounds))
/// and/or explicit identities (added with [`subscribe_id`](Self::subscribe_id)).
/// Whenever a relevant object is added, moved or removed, the next tick sends
/// the complete current result set on [`updates`](Self::updates). Ticks with
/// nothing new send nothing.
///
/// Dropping the handle stops the listener.
pub struct Listener {
    shared: Arc<ListenerShared>,
    updates: mpsc::Receiver<Batch>,
}

impl Listener {
    pub(crate) fn spawn(
        server: Arc<ServerInner>,
        capacity: usize,
        interval: Duration,
    ) -> Result<Self> {
        validate_listener_params(capacity, interval)?;

        let (tx, rx) = mpsc::channel(capacity);
        let shared = Arc::new(ListenerShared {
            id: Uuid::new_v4(),
            interval,
            server,
            state: Mutex::new(ListenerState {
                markers: Vec::new(),
                types: None,
                watched: FxHashSet::default(),
                dirty: false,
                stopped: false,
            }),
        });

        let worker = shared.clone();
        thread::Builder::new()
            .name(format!("geowatch-listener-{}", shared.id.simple()))
            .spawn(move || worker.run(tx))?;

        debug!(
            "listener {} started (capacity {}, interval {:?})",
            shared.id, capacity, interval
        );

        Ok(Self {
            shared,
            updates: rx,
        })
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Replaces the watched region.
    ///
    /// The region is validated and split before anything changes; on error the
    /// previous region stays in place. Old markers leave the tree and new ones
    /// enter it under the server lock, so no mutation observes a half-replaced
    /// region.
    pub fn set_bounds(&self, bounds: MapBounds) -> Result<()> {
        let rects = bounds.rects()?;
        let server = &self.shared.server;

        let _registry = server.registry.write();
        let mut state = self.shared.state.lock();
        if state.stopped {
            return Ok(());
        }

        for marker in state.markers.drain(..) {
            server.remove_marker(marker);
        }
        state.markers = rects
            .into_iter()
            .map(|rect| server.insert_marker(rect, Arc::downgrade(&self.shared)))
            .collect();

        debug!(
            "listener {} watching {:?} as {} rects",
            self.shared.id,
            bounds,
            state.markers.len()
        );
        Ok(())
    }

    /// Restricts region results to `types`. An empty slice removes the filter.
    ///
    /// Objects subscribed by id are delivered regardless of the filter.
    pub fn set_types(&self, types: &[IndexableType]) {
        let mut state = self.shared.state.lock();
        state.types = if types.is_empty() {
            None
        } else {
            Some(TypeFilter::new(types.iter().copied()))
        };
    }

    /// Follows `id` wherever it is, independent of the watched region.
    pub fn subscribe_id(&self, id: impl Into<String>) {
        let id = id.into();
        let mut registry = self.shared.server.registry.write();
        let mut state = self.shared.state.lock();
        if state.stopped {
            return;
        }

        registry.watch(id.clone(), &self.shared);
        state.watched.insert(id);
    }

    /// Stops following `id`. Returns `true` if it was being followed.
    pub fn unsubscribe_id(&self, id: &str) -> bool {
        let mut registry = self.shared.server.registry.write();
        let mut state = self.shared.state.lock();

        let watched = state.watched.remove(id);
        registry.unwatch(id, self.shared.id) && watched
    }

    /// Makes the next tick emit a snapshot even if nothing changed.
    pub fn force_update(&self) {
        self.shared.mark_dirty();
    }

    /// Removes the listener's region and id-subscriptions from the server.
    ///
    /// The update channel is closed by the notifier on its next tick. Calling
    /// `stop` more than once is harmless.
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    /// Receiving side of the update channel.
    pub fn updates(&mut self) -> &mut mpsc::Receiver<Batch> {
        &mut self.updates
    }

    /// Rectangles currently making up the watched region.
    pub fn regions(&self) -> Vec<Rect> {
        let state = self.shared.state.lock();
        state.markers.iter().map(|m| *m.bounds()).collect()
    }

    pub fn watched_ids(&self) -> Vec<String> {
        let state = self.shared.state.lock();
        state.watched.iter().cloned().collect()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.shared.stop();
    }
}
