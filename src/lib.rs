//! In-memory geospatial index with live region and id subscriptions.
//!
//! Objects with a bounding rectangle on the latitude/longitude plane are
//! stored in a shared R*-tree. Listeners subscribe to a region (which may
//! cross the antimeridian or a pole) and/or to specific identities, and
//! periodically receive the full set of objects currently matching them.
//!
//! ```rust
//! use geowatch::{Indexable, IndexableType, MapBounds, Object, Server};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let server = Server::new(25, 50)?;
//! let mut listener = server.new_listener(100, Duration::from_millis(10))?;
//!
//! // a region spanning the dateline is split into two rectangles
//! listener.set_bounds(MapBounds::new(170.0, -10.0, -170.0, 10.0))?;
//!
//! let ship = Object::at("ship-1", IndexableType(1), 0.0, 179.0, 0.01, 0.01, None)?;
//! server.add(Arc::new(ship))?;
//!
//! let batch = listener.updates().blocking_recv().unwrap();
//! assert_eq!(batch[0].id(), "ship-1");
//! # Ok::<(), geowatch::GeoWatchError>(())
//! ```

pub mod compute;
pub mod config;
pub mod db;
pub mod error;
mod spatial_index;
pub mod types;

pub use compute::bounds::{MapBounds, RegionRects};
pub use compute::rect::Rect;
pub use config::Config;
pub use db::{Batch, Listener, Server};
pub use error::{GeoWatchError, Result};
pub use types::{Indexable, IndexableType, Object, TypeFilter};

pub use geo::Point;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{GeoWatchError, Result};

    pub use crate::{Batch, Listener, Server};

    pub use crate::{Indexable, IndexableType, Object, TypeFilter};

    pub use crate::{Config, MapBounds, Rect};

    pub use std::sync::Arc;
    pub use std::time::Duration;
}
