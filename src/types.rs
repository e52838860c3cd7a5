//! Indexable entity model.
//!
//! Everything stored in the index implements [`Indexable`]: it has an
//! identity, a bounding rectangle, an optional opaque payload and an integer
//! type tag. Positive tags belong to callers; non-positive tags are reserved
//! for entities the index creates for its own bookkeeping.

use crate::compute::rect::Rect;
use crate::error::Result;
use bytes::Bytes;
use rustc_hash::FxHashSet;
use std::any::Any;
use std::fmt::Debug;

/// Type tag attached to every indexed entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct IndexableType(pub i32);

impl IndexableType {
    /// Tag carried by listener region markers.
    pub const REGION_MARKER: IndexableType = IndexableType(-1);

    /// Returns `true` for tags callers may not use.
    pub fn is_reserved(self) -> bool {
        self.0 <= 0
    }
}

impl From<i32> for IndexableType {
    fn from(value: i32) -> Self {
        IndexableType(value)
    }
}

/// An entity that can live in the spatial index.
pub trait Indexable: Send + Sync + Debug {
    /// Identity, unique within one server.
    fn id(&self) -> &str;

    /// Bounding rectangle in index coordinates (latitude, longitude).
    fn bounds(&self) -> &Rect;

    /// Opaque caller-owned data.
    fn payload(&self) -> Option<&(dyn Any + Send + Sync)> {
        None
    }

    fn kind(&self) -> IndexableType;
}

/// Filter matching entities by type tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeFilter {
    types: FxHashSet<IndexableType>,
}

impl TypeFilter {
    pub fn new(types: impl IntoIterator<Item = IndexableType>) -> Self {
        Self {
            types: types.into_iter().collect(),
        }
    }

    /// Filter matching only listener region markers.
    pub fn region_markers() -> Self {
        Self::new([IndexableType::REGION_MARKER])
    }

    pub fn matches(&self, kind: IndexableType) -> bool {
        self.types.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// General purpose indexable object carrying a [`Bytes`] payload.
///
/// # Examples
///
/// ```
/// use geowatch::{IndexableType, Indexable, Object};
///
/// let plane = Object::at("RF-350", IndexableType(1), 51.47, -0.45, 0.0001, 0.0001, None).unwrap();
/// assert_eq!(plane.id(), "RF-350");
/// assert_eq!(plane.bounds().point_coord(0), 51.47);
/// ```
#[derive(Debug, Clone)]
pub struct Object {
    id: String,
    kind: IndexableType,
    bounds: Rect,
    payload: Option<Bytes>,
}

impl Object {
    pub fn new(
        id: impl Into<String>,
        kind: IndexableType,
        bounds: Rect,
        payload: Option<Bytes>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            bounds,
            payload,
        }
    }

    /// Creates an object whose lowest corner sits at `lat`/`lng`.
    pub fn at(
        id: impl Into<String>,
        kind: IndexableType,
        lat: f64,
        lng: f64,
        size_lat: f64,
        size_lng: f64,
        payload: Option<Bytes>,
    ) -> Result<Self> {
        let bounds = Rect::new([lat, lng], [size_lat, size_lng])?;
        Ok(Self::new(id, kind, bounds, payload))
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }
}

impl Indexable for Object {
    fn id(&self) -> &str {
        &self.id
    }

    fn bounds(&self) -> &Rect {
        &self.bounds
    }

    fn payload(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.payload.as_ref().map(|p| p as &(dyn Any + Send + Sync))
    }

    fn kind(&self) -> IndexableType {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_types() {
        assert!(IndexableType::REGION_MARKER.is_reserved());
        assert!(IndexableType(0).is_reserved());
        assert!(!IndexableType(1).is_reserved());
    }

    #[test]
    fn test_type_filter() {
        let filter = TypeFilter::new([IndexableType(1), IndexableType(3)]);
        assert!(filter.matches(IndexableType(1)));
        assert!(!filter.matches(IndexableType(2)));
        assert!(!filter.matches(IndexableType::REGION_MARKER));

        let markers = TypeFilter::region_markers();
        assert!(markers.matches(IndexableType::REGION_MARKER));
        assert!(!markers.matches(IndexableType(1)));
        assert!(TypeFilter::default().is_empty());
    }

    #[test]
    fn test_object_payload_downcast() {
        let obj = Object::at(
            "truck_001",
            IndexableType(7),
            40.7,
            -74.0,
            0.01,
            0.01,
            Some(Bytes::from("meta")),
        )
        .unwrap();

        let payload = obj.payload().unwrap();
        let bytes = payload.downcast_ref::<Bytes>().unwrap();
        assert_eq!(bytes.as_ref(), b"meta");
        assert_eq!(obj.kind(), IndexableType(7));
    }

    #[test]
    fn test_object_at_rejects_bad_size() {
        assert!(Object::at("x", IndexableType(1), 0.0, 0.0, 0.0, 1.0, None).is_err());
    }
}
