//! **tilesight-core**: geometry and light colour types shared by the
//! *tilesight* crates.

pub mod color;
pub mod geom;

pub use color::{Light, Rgb};
pub use geom::{Point, Range};
