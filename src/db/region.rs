//! Region markers: one rectangle of a listener's watched region, stored in
//! the shared tree so that mutations can discover which listeners they touch.

use super::listener::ListenerShared;
use crate::compute::rect::Rect;
use crate::types::{Indexable, IndexableType};
use std::sync::{Arc, Weak};

#[derive(Debug)]
pub struct RegionMarker {
    id: String,
    rect: Rect,
    listener: Weak<ListenerShared>,
}

impl RegionMarker {
    pub(crate) fn new(id: String, rect: Rect, listener: Weak<ListenerShared>) -> Self {
        Self { id, rect, listener }
    }

    /// The owning listener, if it is still alive.
    pub(crate) fn listener(&self) -> Option<Arc<ListenerShared>> {
        self.listener.upgrade()
    }
}

impl Indexable for RegionMarker {
    fn id(&self) -> &str {
        &self.id
    }

    fn bounds(&self) -> &Rect {
        &self.rect
    }

    fn kind(&self) -> IndexableType {
        IndexableType::REGION_MARKER
    }
}
