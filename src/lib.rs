//! Streaming GPX 1.1 reader and writer with lossless round-trip fidelity.
//!
//! Documents read by [`read`] and written back by [`write`] preserve every
//! value bit for bit: numeric text survives a parse/format cycle, timestamps
//! are normalized to UTC once, and extension content is carried verbatim.
//!
//! ```no_run
//! use gpxio::{ReadOptions, WriteOptions, DefaultHooks};
//!
//! let xml = std::fs::read_to_string("track.gpx")?;
//! let gpx = gpxio::read(&xml, &ReadOptions::default(), &DefaultHooks)?;
//! if let Some(gpx) = gpx {
//!     let out = gpxio::write(&gpx, &WriteOptions::default(), &DefaultHooks)?;
//!     std::fs::write("track-out.gpx", out)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod extensions;
mod model;
mod options;
mod reader;
mod table;
mod types;
mod writer;

pub use error::{GpxError, Result};
pub use extensions::{DefaultHooks, ExtensionHooks, Extensions};
pub use model::{
    Bounds, Copyright, Email, Gpx, Link, Metadata, Person, Route, Track, TrackSegment, Waypoint,
};
pub use options::{ReadOptions, WriteOptions};
pub use reader::{GpxEvent, read, read_stream};
pub use table::{WaypointIter, WaypointTable, WaypointTableBuilder};
pub use types::{
    Degrees, DgpsStation, Fix, Latitude, Longitude, Year, YearOffset, format_f64,
};
pub use writer::write;

/// The namespace every emitted root element declares.
pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

/// The one format version the reader accepts by default.
pub const GPX_VERSION: &str = "1.1";
