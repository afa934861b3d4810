//! The in-memory document model: value entities, waypoints, routes, tracks,
//! and document metadata.

use chrono::{DateTime, Utc};

use crate::error::{GpxError, Result};
use crate::extensions::Extensions;
use crate::table::WaypointTable;
use crate::types::{Degrees, DgpsStation, Fix, Latitude, Longitude, Year};

/// A `<link>` to external information.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    pub href: String,
    pub text: Option<String>,
    pub kind: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: None,
            kind: None,
        }
    }
}

/// An e-mail address, split as the format stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Email {
    pub id: String,
    pub domain: String,
}

/// The person or organization behind a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub link: Option<Link>,
}

/// A copyright notice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Copyright {
    pub author: String,
    pub year: Option<Year>,
    pub license: Option<String>,
}

/// The lat/lon extent of a document's content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: Latitude,
    pub min_lon: Longitude,
    pub max_lat: Latitude,
    pub max_lon: Longitude,
}

/// The optional descriptive fields of a waypoint, kept out of line so a bare
/// point costs nothing beyond its coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct WaypointExtras {
    pub ele: Option<f64>,
    pub time: Option<DateTime<Utc>>,
    pub magvar: Option<Degrees>,
    pub geoidheight: Option<f64>,
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<Link>,
    pub sym: Option<String>,
    pub kind: Option<String>,
    pub fix: Option<Fix>,
    pub sat: Option<u32>,
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
    pub pdop: Option<f64>,
    pub ageofdgpsdata: Option<f64>,
    pub dgpsid: Option<DgpsStation>,
    pub extensions: Option<Extensions>,
}

impl WaypointExtras {
    pub(crate) fn is_empty(&self) -> bool {
        *self == WaypointExtras::default()
    }
}

/// A single geographic point, used for `wpt`, `rtept`, and `trkpt`.
///
/// Coordinates are required and stored inline. Every optional field lives in
/// a side block allocated on first use.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    lat: Latitude,
    lon: Longitude,
    extras: Option<Box<WaypointExtras>>,
}

impl Waypoint {
    pub fn new(lat: Latitude, lon: Longitude) -> Self {
        Self {
            lat,
            lon,
            extras: None,
        }
    }

    pub(crate) fn from_parts(
        lat: Latitude,
        lon: Longitude,
        extras: Option<Box<WaypointExtras>>,
    ) -> Self {
        Self { lat, lon, extras }
    }

    pub(crate) fn into_parts(self) -> (Latitude, Longitude, Option<Box<WaypointExtras>>) {
        (self.lat, self.lon, self.extras)
    }

    /// True when no optional field has ever been set.
    pub fn is_bare(&self) -> bool {
        self.extras.is_none()
    }

    pub fn lat(&self) -> Latitude {
        self.lat
    }

    pub fn lon(&self) -> Longitude {
        self.lon
    }

    fn extras_mut(&mut self) -> &mut WaypointExtras {
        self.extras.get_or_insert_with(Default::default)
    }

    pub fn ele(&self) -> Option<f64> {
        self.extras.as_ref().and_then(|x| x.ele)
    }

    /// Elevation must be finite.
    pub fn set_ele(&mut self, ele: f64) -> Result<()> {
        if !ele.is_finite() {
            return Err(GpxError::OutOfRange {
                what: "elevation",
                value: ele,
            });
        }
        self.extras_mut().ele = Some(ele);
        Ok(())
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.extras.as_ref().and_then(|x| x.time)
    }

    /// The type guarantees the UTC invariant: any instant that reaches here
    /// has already been normalized.
    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.extras_mut().time = Some(time);
    }

    pub fn magvar(&self) -> Option<Degrees> {
        self.extras.as_ref().and_then(|x| x.magvar)
    }

    pub fn set_magvar(&mut self, magvar: Degrees) {
        self.extras_mut().magvar = Some(magvar);
    }

    pub fn geoidheight(&self) -> Option<f64> {
        self.extras.as_ref().and_then(|x| x.geoidheight)
    }

    pub fn set_geoidheight(&mut self, geoidheight: f64) {
        self.extras_mut().geoidheight = Some(geoidheight);
    }

    pub fn name(&self) -> Option<&str> {
        self.extras.as_ref().and_then(|x| x.name.as_deref())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.extras_mut().name = Some(name.into());
    }

    pub fn cmt(&self) -> Option<&str> {
        self.extras.as_ref().and_then(|x| x.cmt.as_deref())
    }

    pub fn set_cmt(&mut self, cmt: impl Into<String>) {
        self.extras_mut().cmt = Some(cmt.into());
    }

    pub fn desc(&self) -> Option<&str> {
        self.extras.as_ref().and_then(|x| x.desc.as_deref())
    }

    pub fn set_desc(&mut self, desc: impl Into<String>) {
        self.extras_mut().desc = Some(desc.into());
    }

    pub fn src(&self) -> Option<&str> {
        self.extras.as_ref().and_then(|x| x.src.as_deref())
    }

    pub fn set_src(&mut self, src: impl Into<String>) {
        self.extras_mut().src = Some(src.into());
    }

    pub fn links(&self) -> &[Link] {
        self.extras.as_ref().map_or(&[], |x| x.links.as_slice())
    }

    pub fn add_link(&mut self, link: Link) {
        self.extras_mut().links.push(link);
    }

    pub fn sym(&self) -> Option<&str> {
        self.extras.as_ref().and_then(|x| x.sym.as_deref())
    }

    pub fn set_sym(&mut self, sym: impl Into<String>) {
        self.extras_mut().sym = Some(sym.into());
    }

    pub fn kind(&self) -> Option<&str> {
        self.extras.as_ref().and_then(|x| x.kind.as_deref())
    }

    pub fn set_kind(&mut self, kind: impl Into<String>) {
        self.extras_mut().kind = Some(kind.into());
    }

    pub fn fix(&self) -> Option<Fix> {
        self.extras.as_ref().and_then(|x| x.fix)
    }

    pub fn set_fix(&mut self, fix: Fix) {
        self.extras_mut().fix = Some(fix);
    }

    pub fn sat(&self) -> Option<u32> {
        self.extras.as_ref().and_then(|x| x.sat)
    }

    pub fn set_sat(&mut self, sat: u32) {
        self.extras_mut().sat = Some(sat);
    }

    pub fn hdop(&self) -> Option<f64> {
        self.extras.as_ref().and_then(|x| x.hdop)
    }

    pub fn set_hdop(&mut self, hdop: f64) {
        self.extras_mut().hdop = Some(hdop);
    }

    pub fn vdop(&self) -> Option<f64> {
        self.extras.as_ref().and_then(|x| x.vdop)
    }

    pub fn set_vdop(&mut self, vdop: f64) {
        self.extras_mut().vdop = Some(vdop);
    }

    pub fn pdop(&self) -> Option<f64> {
        self.extras.as_ref().and_then(|x| x.pdop)
    }

    pub fn set_pdop(&mut self, pdop: f64) {
        self.extras_mut().pdop = Some(pdop);
    }

    pub fn ageofdgpsdata(&self) -> Option<f64> {
        self.extras.as_ref().and_then(|x| x.ageofdgpsdata)
    }

    pub fn set_ageofdgpsdata(&mut self, age: f64) {
        self.extras_mut().ageofdgpsdata = Some(age);
    }

    pub fn dgpsid(&self) -> Option<DgpsStation> {
        self.extras.as_ref().and_then(|x| x.dgpsid)
    }

    pub fn set_dgpsid(&mut self, dgpsid: DgpsStation) {
        self.extras_mut().dgpsid = Some(dgpsid);
    }

    pub fn extensions(&self) -> Option<&Extensions> {
        self.extras.as_ref().and_then(|x| x.extensions.as_ref())
    }

    pub fn set_extensions(&mut self, extensions: Extensions) {
        self.extras_mut().extensions = Some(extensions);
    }
}

/// Document-level metadata. `creator` comes from the root attribute and is
/// the one field always present, even in a trivial document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub creator: String,
    pub name: Option<String>,
    pub desc: Option<String>,
    pub author: Option<Person>,
    pub copyright: Option<Copyright>,
    pub links: Vec<Link>,
    pub time: Option<DateTime<Utc>>,
    pub keywords: Option<String>,
    pub bounds: Option<Bounds>,
    pub extensions: Option<Extensions>,
}

impl Metadata {
    pub fn new(creator: impl Into<String>) -> Self {
        Self {
            creator: creator.into(),
            ..Default::default()
        }
    }

    /// True when every optional field is absent. The writer emits no
    /// `<metadata>` element for a trivial value.
    pub fn is_trivial(&self) -> bool {
        self.name.is_none()
            && self.desc.is_none()
            && self.author.is_none()
            && self.copyright.is_none()
            && self.links.is_empty()
            && self.time.is_none()
            && self.keywords.is_none()
            && self.bounds.is_none()
            && self.extensions.is_none()
    }
}

/// An ordered, named sequence of waypoints to follow point-to-point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<Link>,
    pub number: Option<u32>,
    pub kind: Option<String>,
    pub extensions: Option<Extensions>,
    pub points: WaypointTable,
}

/// One continuous run of track points; segment boundaries mark path
/// discontinuities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSegment {
    pub points: WaypointTable,
    pub extensions: Option<Extensions>,
}

/// A recorded or planned path made of ordered segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<Link>,
    pub number: Option<u32>,
    pub kind: Option<String>,
    pub extensions: Option<Extensions>,
    pub segments: Vec<TrackSegment>,
}

/// A complete GPX document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gpx {
    pub metadata: Metadata,
    pub waypoints: Vec<Waypoint>,
    pub routes: Vec<Route>,
    pub tracks: Vec<Track>,
    pub extensions: Option<Extensions>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Latitude, Longitude};

    fn point(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(Latitude::new(lat).unwrap(), Longitude::new(lon).unwrap())
    }

    #[test]
    fn test_bare_point_has_no_extras() {
        let wp = point(35.0, 139.0);
        assert!(wp.is_bare());
        assert_eq!(wp.ele(), None);
        assert_eq!(wp.name(), None);
        assert!(wp.links().is_empty());
    }

    #[test]
    fn test_extras_allocated_on_first_set() {
        let mut wp = point(35.0, 139.0);
        wp.set_name("summit");
        assert!(!wp.is_bare());
        assert_eq!(wp.name(), Some("summit"));
        assert_eq!(wp.desc(), None);
    }

    #[test]
    fn test_elevation_must_be_finite() {
        let mut wp = point(35.0, 139.0);
        assert!(wp.set_ele(f64::NAN).is_err());
        assert!(wp.set_ele(f64::INFINITY).is_err());
        assert!(wp.is_bare());
        assert!(wp.set_ele(40.5).is_ok());
        assert_eq!(wp.ele(), Some(40.5));
    }

    #[test]
    fn test_trivial_metadata() {
        let md = Metadata::new("unit-test");
        assert!(md.is_trivial());

        let mut md = Metadata::new("unit-test");
        md.keywords = Some("hiking".to_string());
        assert!(!md.is_trivial());
    }
}
