//! Geometry layer: rectangles, region splitting and input validation.
//!
//! Everything here is pure computation with no shared state; the index and
//! its listeners build on these types.

pub mod bounds;
pub mod rect;
pub mod validation;
