//! Axis-aligned rectangles in the index coordinate space.
//!
//! Axis 0 is latitude and axis 1 is longitude. Every rectangle stored in the
//! index, whether it belongs to a tracked object or to a listener region, uses
//! this order.

use crate::error::{GeoWatchError, Result};
use rstar::AABB;

/// Latitude axis index.
pub const LAT: usize = 0;
/// Longitude axis index.
pub const LNG: usize = 1;

/// A validated 2D rectangle with strictly positive extent on both axes.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    lower: [f64; 2],
    upper: [f64; 2],
}

impl Rect {
    /// The whole latitude/longitude plane.
    pub const WORLD: Rect = Rect {
        lower: [-90.0, -180.0],
        upper: [90.0, 180.0],
    };

    /// Builds a rectangle from its origin (lowest corner) and per-axis lengths.
    ///
    /// # Examples
    ///
    /// ```
    /// use geowatch::Rect;
    ///
    /// let rect = Rect::new([10.0, 20.0], [1.0, 2.0]).unwrap();
    /// assert_eq!(rect.upper(), [11.0, 22.0]);
    ///
    /// assert!(Rect::new([0.0, 0.0], [0.0, 1.0]).is_err());
    /// assert!(Rect::new([f64::NAN, 0.0], [1.0, 1.0]).is_err());
    /// ```
    pub fn new(origin: [f64; 2], lengths: [f64; 2]) -> Result<Self> {
        for axis in [LAT, LNG] {
            if !origin[axis].is_finite() {
                return Err(GeoWatchError::InvalidRect(format!(
                    "origin coordinate {} must be finite, got: {}",
                    axis, origin[axis]
                )));
            }
            if !lengths[axis].is_finite() || lengths[axis] <= 0.0 {
                return Err(GeoWatchError::InvalidRect(format!(
                    "length {} must be finite and positive, got: {}",
                    axis, lengths[axis]
                )));
            }
        }

        let upper = [origin[LAT] + lengths[LAT], origin[LNG] + lengths[LNG]];
        if !upper[LAT].is_finite() || !upper[LNG].is_finite() {
            return Err(GeoWatchError::InvalidRect(format!(
                "upper corner overflows: {:?}",
                upper
            )));
        }

        Ok(Self {
            lower: origin,
            upper,
        })
    }

    /// Builds a rectangle from its lowest and highest corners.
    pub fn from_corners(lower: [f64; 2], upper: [f64; 2]) -> Result<Self> {
        Self::new(lower, [upper[LAT] - lower[LAT], upper[LNG] - lower[LNG]])
    }

    /// Lowest coordinate along `axis`.
    pub fn point_coord(&self, axis: usize) -> f64 {
        self.lower[axis]
    }

    /// Extent along `axis`.
    pub fn length(&self, axis: usize) -> f64 {
        self.upper[axis] - self.lower[axis]
    }

    pub fn lower(&self) -> [f64; 2] {
        self.lower
    }

    pub fn upper(&self) -> [f64; 2] {
        self.upper
    }

    /// Closed-interval intersection test; rectangles sharing an edge intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        (0..2).all(|axis| {
            self.lower[axis] <= other.upper[axis] && other.lower[axis] <= self.upper[axis]
        })
    }

    pub(crate) fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners(self.lower, self.upper)
    }
}
