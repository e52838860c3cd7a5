//! World-coordinate regions and their conversion into index rectangles.
//!
//! A region is given by its south-west and north-east corners. When the
//! south-west longitude is greater than the north-east one the region crosses
//! the antimeridian; when the south-west latitude is greater than the
//! north-east one it crosses a pole. Either case is split into non-wrapping
//! pieces, so a single region yields one, two or four rectangles.

use crate::compute::rect::Rect;
use crate::compute::validation::validate_lng_lat;
use crate::error::{GeoWatchError, Result};
use geo::Point;
use smallvec::SmallVec;

/// Eastern edge used when a region is split at the antimeridian.
pub const EASTMOST_LONGITUDE: f64 = 179.9999999;
/// Northern edge used when a region is split at a pole.
pub const NORTHMOST_LATITUDE: f64 = 89.9999999;

/// Rectangles produced by splitting one region.
pub type RegionRects = SmallVec<[Rect; 4]>;

/// A world-coordinates bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MapBounds {
    pub south_west_lng: f64,
    pub south_west_lat: f64,
    pub north_east_lng: f64,
    pub north_east_lat: f64,
}

impl MapBounds {
    pub fn new(
        south_west_lng: f64,
        south_west_lat: f64,
        north_east_lng: f64,
        north_east_lat: f64,
    ) -> Self {
        Self {
            south_west_lng,
            south_west_lat,
            north_east_lng,
            north_east_lat,
        }
    }

    /// Builds bounds from two corner points (x = longitude, y = latitude).
    pub fn from_points(south_west: Point, north_east: Point) -> Self {
        Self::new(south_west.x(), south_west.y(), north_east.x(), north_east.y())
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.south_west_lng > self.north_east_lng
    }

    pub fn crosses_pole(&self) -> bool {
        self.south_west_lat > self.north_east_lat
    }

    fn split(&self) -> SmallVec<[MapBounds; 4]> {
        let mut boxes: SmallVec<[MapBounds; 4]> = SmallVec::new();
        boxes.push(*self);

        if self.crosses_antimeridian() {
            boxes = boxes
                .iter()
                .flat_map(|b| {
                    [
                        // western box
                        MapBounds::new(
                            b.south_west_lng,
                            b.south_west_lat,
                            EASTMOST_LONGITUDE,
                            b.north_east_lat,
                        ),
                        // eastern box
                        MapBounds::new(
                            -EASTMOST_LONGITUDE,
                            b.south_west_lat,
                            b.north_east_lng,
                            b.north_east_lat,
                        ),
                    ]
                })
                .collect();
        }

        if self.crosses_pole() {
            boxes = boxes
                .iter()
                .flat_map(|b| {
                    [
                        // northern box
                        MapBounds::new(
                            b.south_west_lng,
                            b.south_west_lat,
                            b.north_east_lng,
                            NORTHMOST_LATITUDE,
                        ),
                        // southern box
                        MapBounds::new(
                            b.south_west_lng,
                            -NORTHMOST_LATITUDE,
                            b.north_east_lng,
                            b.north_east_lat,
                        ),
                    ]
                })
                .collect();
        }

        // a corner sitting on the antimeridian or a pole leaves an empty piece
        if boxes.len() > 1 {
            boxes.retain(|b| b.has_extent());
        }

        boxes
    }

    fn has_extent(&self) -> bool {
        self.north_east_lng > self.south_west_lng && self.north_east_lat > self.south_west_lat
    }

    /// Converts a non-wrapping box into an index rectangle (latitude first).
    fn rect(&self) -> Result<Rect> {
        Rect::new(
            [self.south_west_lat, self.south_west_lng],
            [
                self.north_east_lat - self.south_west_lat,
                self.north_east_lng - self.south_west_lng,
            ],
        )
    }

    /// Returns the index rectangles covering these bounds, splitting at the
    /// antimeridian and the poles.
    ///
    /// # Examples
    ///
    /// ```
    /// use geowatch::MapBounds;
    ///
    /// let plain = MapBounds::new(-10.0, -10.0, 10.0, 10.0);
    /// assert_eq!(plain.rects().unwrap().len(), 1);
    ///
    /// let dateline = MapBounds::new(170.0, -10.0, -170.0, 10.0);
    /// assert_eq!(dateline.rects().unwrap().len(), 2);
    /// ```
    pub fn rects(&self) -> Result<RegionRects> {
        validate_lng_lat(self.south_west_lng, self.south_west_lat)?;
        validate_lng_lat(self.north_east_lng, self.north_east_lat)?;

        let pieces = self.split();
        if pieces.is_empty() {
            return Err(GeoWatchError::InvalidRect(format!(
                "region {:?} has no extent",
                self
            )));
        }

        pieces.iter().map(MapBounds::rect).collect()
    }
}
