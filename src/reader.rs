//! Single-pass, forward-only streaming parser.
//!
//! The reader walks the document once, dispatching on element names. It
//! tolerates reordered and unknown content, enforces the per-entity schemas,
//! and reports each waypoint, route, and track as soon as its closing tag is
//! consumed, so a streaming consumer never holds more than one entity.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use quick_xml::Reader;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};

use crate::GPX_VERSION;
use crate::error::{GpxError, Result};
use crate::extensions::{ExtensionHooks, Extensions, PointKind};
use crate::model::{
    Bounds, Copyright, Email, Gpx, Link, Metadata, Person, Route, Track, TrackSegment, Waypoint,
};
use crate::options::ReadOptions;
use crate::table::WaypointTableBuilder;
use crate::types::{Degrees, DgpsStation, Fix, Latitude, Longitude, Year};

/// One fully-read entity, reported by [`read_stream`] in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum GpxEvent {
    Metadata(Metadata),
    Waypoint(Waypoint),
    Route(Route),
    Track(Track),
    Extensions(Extensions),
}

/// Read a complete document into memory.
///
/// Returns `Ok(None)` when the input contains no acceptable root element;
/// callers must not assume a document was present.
pub fn read(xml: &str, options: &ReadOptions, hooks: &dyn ExtensionHooks) -> Result<Option<Gpx>> {
    let mut doc: Option<Gpx> = None;
    read_stream(xml, options, hooks, |event| {
        let doc = doc.get_or_insert_with(Gpx::default);
        match event {
            GpxEvent::Metadata(metadata) => doc.metadata = metadata,
            GpxEvent::Waypoint(point) => doc.waypoints.push(point),
            GpxEvent::Route(route) => doc.routes.push(route),
            GpxEvent::Track(track) => doc.tracks.push(track),
            GpxEvent::Extensions(payload) => doc.extensions = Some(payload),
        }
    })?;
    Ok(doc)
}

/// Read in streaming mode: `handler` is invoked once per fully-read entity,
/// keeping memory O(1) in the document size.
///
/// Entities handed out before a structural error remain valid; the offending
/// entity itself is never published.
pub fn read_stream(
    xml: &str,
    options: &ReadOptions,
    hooks: &dyn ExtensionHooks,
    mut handler: impl FnMut(GpxEvent),
) -> Result<()> {
    options.validate()?;
    tracing::debug!(bytes = xml.len(), "reading gpx document");
    let mut parser = Parser {
        reader: Reader::from_str(xml),
        xml,
        options,
        hooks,
    };
    parser.run(&mut handler)
}

/// Tracks the first-sibling-wins rules for `<metadata>` and root-level
/// `<extensions>`, across every accepted root in the input.
#[derive(Default)]
struct DocState {
    metadata_done: bool,
    extensions_done: bool,
}

struct Parser<'a, 'h> {
    reader: Reader<&'a [u8]>,
    xml: &'a str,
    options: &'h ReadOptions,
    hooks: &'h dyn ExtensionHooks,
}

impl Parser<'_, '_> {
    fn run(&mut self, handler: &mut dyn FnMut(GpxEvent)) -> Result<()> {
        let mut doc = DocState::default();
        loop {
            match self.reader.read_event()? {
                Event::Start(e) if e.local_name().as_ref() == b"gpx" => {
                    match self.root_policy(&e)? {
                        Some(creator) => self.read_root(&creator, &mut doc, handler)?,
                        None => {
                            self.reader.read_to_end(e.name())?;
                        }
                    }
                }
                Event::Empty(e) if e.local_name().as_ref() == b"gpx" => {
                    // an empty root still gets its attribute policy applied
                    if let Some(creator) = self.root_policy(&e)?
                        && !doc.metadata_done
                    {
                        doc.metadata_done = true;
                        handler(GpxEvent::Metadata(Metadata::new(creator)));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply the compatibility policy to a root element's attributes.
    /// `None` means the whole root subtree is to be skipped.
    fn root_policy(&self, start: &BytesStart<'_>) -> Result<Option<String>> {
        let mut version = None;
        let mut creator = None;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| GpxError::Xml(e.into()))?;
            match attr.key.local_name().as_ref() {
                b"version" => version = Some(attr_text(&attr)),
                b"creator" => creator = Some(attr_text(&attr)),
                _ => {}
            }
        }
        if !self.options.ignore_version && version.as_deref() != Some(GPX_VERSION) {
            tracing::debug!(?version, "skipping gpx root with unsupported version");
            return Ok(None);
        }
        match creator.or_else(|| self.options.default_creator.clone()) {
            Some(creator) => Ok(Some(creator)),
            None => {
                tracing::debug!("skipping gpx root without a creator attribute");
                Ok(None)
            }
        }
    }

    fn read_root(
        &mut self,
        creator: &str,
        doc: &mut DocState,
        handler: &mut dyn FnMut(GpxEvent),
    ) -> Result<()> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"metadata" => {
                        if doc.metadata_done {
                            self.reader.read_to_end(e.name())?;
                        } else {
                            let metadata = self.parse_metadata(creator)?;
                            doc.metadata_done = true;
                            handler(GpxEvent::Metadata(metadata));
                        }
                    }
                    b"wpt" => {
                        let point = self.parse_waypoint(&e, PointKind::Waypoint)?;
                        handler(GpxEvent::Waypoint(point));
                    }
                    b"rte" => handler(GpxEvent::Route(self.parse_route()?)),
                    b"trk" => handler(GpxEvent::Track(self.parse_track()?)),
                    b"extensions" => {
                        if doc.extensions_done {
                            self.reader.read_to_end(e.name())?;
                        } else {
                            let raw = self.capture_extensions(&e)?;
                            doc.extensions_done = true;
                            if let Some(payload) = self.hooks.read_document(raw) {
                                handler(GpxEvent::Extensions(payload));
                            }
                        }
                    }
                    _ => {
                        self.reader.read_to_end(e.name())?;
                    }
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"wpt" => {
                        let (lat, lon) = parse_coords(&e, "wpt")?;
                        handler(GpxEvent::Waypoint(Waypoint::new(lat, lon)));
                    }
                    b"rte" => handler(GpxEvent::Route(Route::default())),
                    b"trk" => handler(GpxEvent::Track(Track::default())),
                    // a self-closing element still claims the first-sibling
                    // slot, so later duplicates are ignored
                    b"metadata" => {
                        if !doc.metadata_done {
                            doc.metadata_done = true;
                            handler(GpxEvent::Metadata(Metadata::new(creator)));
                        }
                    }
                    b"extensions" => {
                        if !doc.extensions_done {
                            doc.extensions_done = true;
                            if let Some(payload) = self.hooks.read_document(Extensions::default())
                            {
                                handler(GpxEvent::Extensions(payload));
                            }
                        }
                    }
                    _ => {}
                },
                Event::End(_) => break,
                Event::Eof => break,
                _ => {}
            }
        }
        // A root without a metadata element still yields a trivial one, so
        // the creator attribute always reaches the caller.
        if !doc.metadata_done {
            doc.metadata_done = true;
            handler(GpxEvent::Metadata(Metadata::new(creator)));
        }
        Ok(())
    }

    fn parse_metadata(&mut self, creator: &str) -> Result<Metadata> {
        let mut metadata = Metadata::new(creator);
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"name" => metadata.name = Some(self.read_text(&e)?),
                    b"desc" => metadata.desc = Some(self.read_text(&e)?),
                    b"author" => metadata.author = Some(self.parse_person(&e)?),
                    b"copyright" => metadata.copyright = Some(self.parse_copyright(&e)?),
                    b"link" => metadata.links.push(self.parse_link(&e)?),
                    b"time" => {
                        if let Some(time) = self.parse_time_element(&e)? {
                            metadata.time = Some(time);
                        }
                    }
                    b"keywords" => metadata.keywords = Some(self.read_text(&e)?),
                    b"bounds" => {
                        metadata.bounds = Some(parse_bounds(&e)?);
                        self.reader.read_to_end(e.name())?;
                    }
                    b"extensions" => {
                        let raw = self.capture_extensions(&e)?;
                        metadata.extensions = self.hooks.read_metadata(raw);
                    }
                    _ => {
                        self.reader.read_to_end(e.name())?;
                    }
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"bounds" => metadata.bounds = Some(parse_bounds(&e)?),
                    b"link" => metadata.links.push(link_from_attrs(&e)?),
                    b"author" => metadata.author = Some(Person::default()),
                    b"copyright" => metadata.copyright = Some(copyright_from_attrs(&e)?),
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"metadata" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(metadata)
    }

    fn parse_person(&mut self, start: &BytesStart<'_>) -> Result<Person> {
        let end_name = start.name().0.to_vec();
        let mut person = Person::default();
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"name" => person.name = Some(self.read_text(&e)?),
                    b"email" => {
                        person.email = Some(email_from_attrs(&e)?);
                        self.reader.read_to_end(e.name())?;
                    }
                    b"link" => person.link = Some(self.parse_link(&e)?),
                    _ => {
                        self.reader.read_to_end(e.name())?;
                    }
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"email" => person.email = Some(email_from_attrs(&e)?),
                    b"link" => person.link = Some(link_from_attrs(&e)?),
                    _ => {}
                },
                Event::End(e) if e.name().0 == end_name.as_slice() => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(person)
    }

    fn parse_copyright(&mut self, start: &BytesStart<'_>) -> Result<Copyright> {
        let mut copyright = copyright_from_attrs(start)?;
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"year" => {
                        let text = self.read_text(&e)?;
                        copyright.year = Some(text.trim().parse::<Year>()?);
                    }
                    b"license" => copyright.license = Some(self.read_text(&e)?),
                    _ => {
                        self.reader.read_to_end(e.name())?;
                    }
                },
                Event::End(e) if e.local_name().as_ref() == b"copyright" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(copyright)
    }

    /// Parse a `<link>` element and its children.
    fn parse_link(&mut self, start: &BytesStart<'_>) -> Result<Link> {
        let mut link = link_from_attrs(start)?;
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"text" => link.text = Some(self.read_text(&e)?),
                    b"type" => link.kind = Some(self.read_text(&e)?),
                    _ => {
                        self.reader.read_to_end(e.name())?;
                    }
                },
                Event::End(e) if e.local_name().as_ref() == b"link" => break,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(link)
    }

    /// Parse a point element (wpt, rtept, trkpt) and its children.
    /// Called after receiving `Event::Start` for the point element.
    fn parse_waypoint(&mut self, start: &BytesStart<'_>, kind: PointKind) -> Result<Waypoint> {
        let element = kind.element();
        let (lat, lon) = parse_coords(start, element)?;
        let mut point = Waypoint::new(lat, lon);
        let end_name = start.name().0.to_vec();

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"ele" => {
                        let ele = self.read_f64(&e, "ele")?;
                        point.set_ele(ele)?;
                    }
                    b"time" => {
                        if let Some(time) = self.parse_time_element(&e)? {
                            point.set_time(time);
                        }
                    }
                    b"magvar" => point.set_magvar(Degrees::new(self.read_f64(&e, "magvar")?)?),
                    b"geoidheight" => point.set_geoidheight(self.read_f64(&e, "geoidheight")?),
                    b"name" => point.set_name(self.read_text(&e)?),
                    b"cmt" => point.set_cmt(self.read_text(&e)?),
                    b"desc" => point.set_desc(self.read_text(&e)?),
                    b"src" => point.set_src(self.read_text(&e)?),
                    b"link" => point.add_link(self.parse_link(&e)?),
                    b"sym" => point.set_sym(self.read_text(&e)?),
                    b"type" => point.set_kind(self.read_text(&e)?),
                    b"fix" => {
                        let text = self.read_text(&e)?;
                        let fix =
                            Fix::from_token(text.trim()).ok_or_else(|| GpxError::BadEnum {
                                element: "fix",
                                value: text.clone(),
                            })?;
                        point.set_fix(fix);
                    }
                    b"sat" => point.set_sat(self.read_u32(&e, "sat")?),
                    b"hdop" => point.set_hdop(self.read_f64(&e, "hdop")?),
                    b"vdop" => point.set_vdop(self.read_f64(&e, "vdop")?),
                    b"pdop" => point.set_pdop(self.read_f64(&e, "pdop")?),
                    b"ageofdgpsdata" => {
                        point.set_ageofdgpsdata(self.read_f64(&e, "ageofdgpsdata")?)
                    }
                    b"dgpsid" => {
                        let text = self.read_text(&e)?;
                        let id: u16 =
                            text.trim().parse().map_err(|_| GpxError::InvalidValue {
                                element: "dgpsid",
                                value: text.clone(),
                                reason: "expected an integer station id",
                            })?;
                        point.set_dgpsid(DgpsStation::new(id)?);
                    }
                    b"extensions" => {
                        let raw = self.capture_extensions(&e)?;
                        if let Some(payload) = kind.read_hook(self.hooks, raw) {
                            point.set_extensions(payload);
                        }
                    }
                    _ => {
                        self.reader.read_to_end(e.name())?;
                    }
                },
                Event::Empty(e) => {
                    if e.local_name().as_ref() == b"link" {
                        point.add_link(link_from_attrs(&e)?);
                    }
                }
                Event::End(e) if e.name().0 == end_name.as_slice() => break,
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(point)
    }

    /// Parse a `<rte>` element.
    fn parse_route(&mut self) -> Result<Route> {
        let mut route = Route::default();
        let mut points = WaypointTableBuilder::new();

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"name" => route.name = Some(self.read_text(&e)?),
                    b"cmt" => route.cmt = Some(self.read_text(&e)?),
                    b"desc" => route.desc = Some(self.read_text(&e)?),
                    b"src" => route.src = Some(self.read_text(&e)?),
                    b"link" => route.links.push(self.parse_link(&e)?),
                    b"number" => route.number = Some(self.read_u32(&e, "number")?),
                    b"type" => route.kind = Some(self.read_text(&e)?),
                    b"extensions" => {
                        let raw = self.capture_extensions(&e)?;
                        route.extensions = self.hooks.read_route(raw);
                    }
                    b"rtept" => points.push(self.parse_waypoint(&e, PointKind::RoutePoint)?),
                    _ => {
                        self.reader.read_to_end(e.name())?;
                    }
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"rtept" => {
                        let (lat, lon) = parse_coords(&e, "rtept")?;
                        points.push(Waypoint::new(lat, lon));
                    }
                    b"link" => route.links.push(link_from_attrs(&e)?),
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"rte" => break,
                Event::Eof => break,
                _ => {}
            }
        }

        route.points = points.finish();
        Ok(route)
    }

    /// Parse a `<trk>` element.
    fn parse_track(&mut self) -> Result<Track> {
        let mut track = Track::default();

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"name" => track.name = Some(self.read_text(&e)?),
                    b"cmt" => track.cmt = Some(self.read_text(&e)?),
                    b"desc" => track.desc = Some(self.read_text(&e)?),
                    b"src" => track.src = Some(self.read_text(&e)?),
                    b"link" => track.links.push(self.parse_link(&e)?),
                    b"number" => track.number = Some(self.read_u32(&e, "number")?),
                    b"type" => track.kind = Some(self.read_text(&e)?),
                    b"extensions" => {
                        let raw = self.capture_extensions(&e)?;
                        track.extensions = self.hooks.read_track(raw);
                    }
                    b"trkseg" => track.segments.push(self.parse_segment()?),
                    _ => {
                        self.reader.read_to_end(e.name())?;
                    }
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"trkseg" => track.segments.push(TrackSegment::default()),
                    b"link" => track.links.push(link_from_attrs(&e)?),
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"trk" => break,
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(track)
    }

    /// Parse a `<trkseg>` element. Empty segments are kept: they mark path
    /// discontinuities and must survive a round trip.
    fn parse_segment(&mut self) -> Result<TrackSegment> {
        let mut segment = TrackSegment::default();
        let mut points = WaypointTableBuilder::new();

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"trkpt" => points.push(self.parse_waypoint(&e, PointKind::TrackPoint)?),
                    b"extensions" => {
                        let raw = self.capture_extensions(&e)?;
                        segment.extensions = self.hooks.read_track_segment(raw);
                    }
                    _ => {
                        self.reader.read_to_end(e.name())?;
                    }
                },
                Event::Empty(e) => {
                    if e.local_name().as_ref() == b"trkpt" {
                        let (lat, lon) = parse_coords(&e, "trkpt")?;
                        points.push(Waypoint::new(lat, lon));
                    }
                }
                Event::End(e) if e.local_name().as_ref() == b"trkseg" => break,
                Event::Eof => break,
                _ => {}
            }
        }

        segment.points = points.finish();
        Ok(segment)
    }

    /// Capture the verbatim inner XML of an `<extensions>` container.
    fn capture_extensions(&mut self, start: &BytesStart<'_>) -> Result<Extensions> {
        let span = self.reader.read_to_end(start.name())?;
        let raw = &self.xml[span.start as usize..span.end as usize];
        Ok(Extensions::new(raw.trim()))
    }

    fn parse_time_element(&mut self, start: &BytesStart<'_>) -> Result<Option<DateTime<Utc>>> {
        let text = self.read_text(start)?;
        match self.parse_timestamp(text.trim()) {
            Ok(time) => Ok(Some(time)),
            Err(_) if self.options.ignore_bad_timestamps => {
                tracing::warn!(value = %text, "dropping malformed timestamp");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Accept any RFC 3339 instant (normalized to UTC); resolve offset-less
    /// datetimes against the configured reference offset or the local zone.
    fn parse_timestamp(&self, text: &str) -> Result<DateTime<Utc>> {
        if let Ok(time) = DateTime::parse_from_rfc3339(text) {
            return Ok(time.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|_| GpxError::BadTimestamp(text.to_string()))?;
        let resolved = match self.options.reference_offset {
            Some(offset) => offset
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc)),
            None => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc)),
        };
        resolved.ok_or_else(|| GpxError::BadTimestamp(text.to_string()))
    }

    fn read_f64(&mut self, start: &BytesStart<'_>, element: &'static str) -> Result<f64> {
        let text = self.read_text(start)?;
        let value: f64 = text.trim().parse().map_err(|_| GpxError::InvalidValue {
            element,
            value: text.clone(),
            reason: "expected a decimal number",
        })?;
        if !value.is_finite() {
            return Err(GpxError::InvalidValue {
                element,
                value: text,
                reason: "expected a finite number",
            });
        }
        Ok(value)
    }

    fn read_u32(&mut self, start: &BytesStart<'_>, element: &'static str) -> Result<u32> {
        let text = self.read_text(start)?;
        text.trim().parse().map_err(|_| GpxError::InvalidValue {
            element,
            value: text.clone(),
            reason: "expected a non-negative integer",
        })
    }

    /// Read text content of an element as an owned String.
    /// Handles regular text, CDATA sections, and entity references.
    fn read_text(&mut self, start: &BytesStart<'_>) -> Result<String> {
        let end_name = start.name().0.to_vec();
        let mut text = String::new();

        loop {
            match self.reader.read_event()? {
                Event::Text(e) => {
                    text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
                }
                Event::CData(e) => {
                    text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
                }
                Event::GeneralRef(e) => {
                    // Character references (&#60; &#x3C;) and the predefined
                    // XML entities; anything else is dropped.
                    if let Ok(Some(ch)) = e.resolve_char_ref() {
                        text.push(ch);
                    } else {
                        let name = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                        match name {
                            "amp" => text.push('&'),
                            "lt" => text.push('<'),
                            "gt" => text.push('>'),
                            "quot" => text.push('"'),
                            "apos" => text.push('\''),
                            _ => {}
                        }
                    }
                }
                Event::End(e) if e.name().0 == end_name.as_slice() => break,
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(text)
    }
}

/// Parse the required lat/lon attributes from a point element's start tag.
fn parse_coords(start: &BytesStart<'_>, element: &'static str) -> Result<(Latitude, Longitude)> {
    let mut lat: Option<Latitude> = None;
    let mut lon: Option<Longitude> = None;

    for attr_result in start.attributes() {
        let attr = attr_result.map_err(|e| GpxError::Xml(e.into()))?;
        let key = attr.key.local_name();
        match key.as_ref() {
            b"lat" | b"lon" => {
                let text = attr_text(&attr);
                let attribute = if key.as_ref() == b"lat" { "lat" } else { "lon" };
                let value: f64 =
                    text.trim()
                        .parse()
                        .map_err(|_| GpxError::InvalidAttribute {
                            element,
                            attribute,
                            value: text.clone(),
                        })?;
                if attribute == "lat" {
                    lat = Some(Latitude::new(value)?);
                } else {
                    lon = Some(Longitude::new(value)?);
                }
            }
            _ => {}
        }
    }

    let lat = lat.ok_or(GpxError::MissingAttribute {
        element,
        attribute: "lat",
    })?;
    let lon = lon.ok_or(GpxError::MissingAttribute {
        element,
        attribute: "lon",
    })?;
    Ok((lat, lon))
}

fn link_from_attrs(start: &BytesStart<'_>) -> Result<Link> {
    let mut href = None;
    for attr_result in start.attributes() {
        let attr = attr_result.map_err(|e| GpxError::Xml(e.into()))?;
        if attr.key.local_name().as_ref() == b"href" {
            href = Some(attr_text(&attr));
        }
    }
    let href = href.ok_or(GpxError::MissingAttribute {
        element: "link",
        attribute: "href",
    })?;
    Ok(Link::new(href))
}

fn copyright_from_attrs(start: &BytesStart<'_>) -> Result<Copyright> {
    let mut author = None;
    for attr_result in start.attributes() {
        let attr = attr_result.map_err(|e| GpxError::Xml(e.into()))?;
        if attr.key.local_name().as_ref() == b"author" {
            author = Some(attr_text(&attr));
        }
    }
    let author = author.ok_or(GpxError::MissingAttribute {
        element: "copyright",
        attribute: "author",
    })?;
    Ok(Copyright {
        author,
        year: None,
        license: None,
    })
}

fn email_from_attrs(start: &BytesStart<'_>) -> Result<Email> {
    let mut id = None;
    let mut domain = None;
    for attr_result in start.attributes() {
        let attr = attr_result.map_err(|e| GpxError::Xml(e.into()))?;
        match attr.key.local_name().as_ref() {
            b"id" => id = Some(attr_text(&attr)),
            b"domain" => domain = Some(attr_text(&attr)),
            _ => {}
        }
    }
    Ok(Email {
        id: id.ok_or(GpxError::MissingAttribute {
            element: "email",
            attribute: "id",
        })?,
        domain: domain.ok_or(GpxError::MissingAttribute {
            element: "email",
            attribute: "domain",
        })?,
    })
}

fn parse_bounds(start: &BytesStart<'_>) -> Result<Bounds> {
    let mut min_lat = None;
    let mut min_lon = None;
    let mut max_lat = None;
    let mut max_lon = None;

    for attr_result in start.attributes() {
        let attr = attr_result.map_err(|e| GpxError::Xml(e.into()))?;
        let key = attr.key.local_name();
        let attribute = match key.as_ref() {
            b"minlat" => "minlat",
            b"minlon" => "minlon",
            b"maxlat" => "maxlat",
            b"maxlon" => "maxlon",
            _ => continue,
        };
        let text = attr_text(&attr);
        let value: f64 = text
            .trim()
            .parse()
            .map_err(|_| GpxError::InvalidAttribute {
                element: "bounds",
                attribute,
                value: text.clone(),
            })?;
        match attribute {
            "minlat" => min_lat = Some(Latitude::new(value)?),
            "minlon" => min_lon = Some(Longitude::new(value)?),
            "maxlat" => max_lat = Some(Latitude::new(value)?),
            _ => max_lon = Some(Longitude::new(value)?),
        }
    }

    let missing = |attribute: &'static str| GpxError::MissingAttribute {
        element: "bounds",
        attribute,
    };
    Ok(Bounds {
        min_lat: min_lat.ok_or_else(|| missing("minlat"))?,
        min_lon: min_lon.ok_or_else(|| missing("minlon"))?,
        max_lat: max_lat.ok_or_else(|| missing("maxlat"))?,
        max_lon: max_lon.ok_or_else(|| missing("maxlon"))?,
    })
}

/// Decode an attribute value, resolving character references and the
/// predefined XML entities.
fn attr_text(attr: &Attribute<'_>) -> String {
    let raw = std::str::from_utf8(&attr.value).unwrap_or_default();
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];
        match rest.find(';') {
            Some(end) => {
                let name = &rest[..end];
                rest = &rest[end + 1..];
                match name {
                    "amp" => out.push('&'),
                    "lt" => out.push('<'),
                    "gt" => out.push('>'),
                    "quot" => out.push('"'),
                    "apos" => out.push('\''),
                    _ => match resolve_char_ref(name) {
                        Some(ch) => out.push(ch),
                        // unknown entity: keep it verbatim
                        None => {
                            out.push('&');
                            out.push_str(name);
                            out.push(';');
                        }
                    },
                }
            }
            None => {
                out.push('&');
                out.push_str(rest);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_char_ref(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
