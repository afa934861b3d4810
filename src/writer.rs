//! Canonical-order document emitter.
//!
//! The writer walks an in-memory document and emits every element in the one
//! order the format mandates, with round-trip-safe numeric text and fixed UTC
//! timestamps. Absent optional content is omitted entirely, so output written
//! from a freshly-read document compares equal to the original under
//! whitespace-insensitive comparison.

use std::io::Write as _;

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::Result;
use crate::extensions::{ExtensionHooks, Extensions, PointKind};
use crate::model::{
    Bounds, Copyright, Email, Gpx, Link, Metadata, Person, Route, Track, TrackSegment, Waypoint,
};
use crate::options::WriteOptions;
use crate::types::format_f64;
use crate::{GPX_NAMESPACE, GPX_VERSION};

/// Serialize a document to GPX 1.1 text.
pub fn write(gpx: &Gpx, options: &WriteOptions, hooks: &dyn ExtensionHooks) -> Result<String> {
    options.validate()?;
    tracing::debug!(
        waypoints = gpx.waypoints.len(),
        routes = gpx.routes.len(),
        tracks = gpx.tracks.len(),
        "writing gpx document"
    );

    let mut emitter = Emitter {
        writer: Writer::new(Vec::new()),
        options,
        hooks,
    };
    emitter.emit_document(gpx)?;
    // the writer only ever receives &str content, so the buffer is UTF-8
    Ok(String::from_utf8_lossy(&emitter.writer.into_inner()).into_owned())
}

struct Emitter<'h> {
    writer: Writer<Vec<u8>>,
    options: &'h WriteOptions,
    hooks: &'h dyn ExtensionHooks,
}

impl Emitter<'_> {
    fn emit_document(&mut self, gpx: &Gpx) -> Result<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("gpx");
        root.push_attribute(("xmlns", GPX_NAMESPACE));
        root.push_attribute(("version", GPX_VERSION));
        root.push_attribute(("creator", gpx.metadata.creator.as_str()));
        for (prefix, uri) in &self.options.namespaces {
            root.push_attribute((format!("xmlns:{prefix}").as_str(), uri.as_str()));
        }
        self.writer.write_event(Event::Start(root))?;

        if !gpx.metadata.is_trivial() {
            self.emit_metadata(&gpx.metadata)?;
        }
        for point in &gpx.waypoints {
            self.emit_waypoint(point, PointKind::Waypoint)?;
        }
        for route in &gpx.routes {
            self.emit_route(route)?;
        }
        for track in &gpx.tracks {
            self.emit_track(track)?;
        }
        if let Some(payload) = &gpx.extensions {
            let content = self.hooks.write_document(payload);
            self.emit_extensions(&content)?;
        }

        self.writer.write_event(Event::End(BytesEnd::new("gpx")))?;
        Ok(())
    }

    fn emit_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new("metadata")))?;
        if let Some(name) = &metadata.name {
            self.emit_text_element("name", name)?;
        }
        if let Some(desc) = &metadata.desc {
            self.emit_text_element("desc", desc)?;
        }
        if let Some(author) = &metadata.author {
            self.emit_person(author)?;
        }
        if let Some(copyright) = &metadata.copyright {
            self.emit_copyright(copyright)?;
        }
        for link in &metadata.links {
            self.emit_link(link)?;
        }
        if let Some(time) = &metadata.time {
            self.emit_text_element("time", &format_time(*time))?;
        }
        if let Some(keywords) = &metadata.keywords {
            self.emit_text_element("keywords", keywords)?;
        }
        if let Some(bounds) = &metadata.bounds {
            self.emit_bounds(bounds)?;
        }
        if let Some(payload) = &metadata.extensions {
            let content = self.hooks.write_metadata(payload);
            self.emit_extensions(&content)?;
        }
        self.writer
            .write_event(Event::End(BytesEnd::new("metadata")))?;
        Ok(())
    }

    fn emit_person(&mut self, person: &Person) -> Result<()> {
        if person.name.is_none() && person.email.is_none() && person.link.is_none() {
            self.writer
                .write_event(Event::Empty(BytesStart::new("author")))?;
            return Ok(());
        }
        self.writer
            .write_event(Event::Start(BytesStart::new("author")))?;
        if let Some(name) = &person.name {
            self.emit_text_element("name", name)?;
        }
        if let Some(email) = &person.email {
            self.emit_email(email)?;
        }
        if let Some(link) = &person.link {
            self.emit_link(link)?;
        }
        self.writer
            .write_event(Event::End(BytesEnd::new("author")))?;
        Ok(())
    }

    fn emit_email(&mut self, email: &Email) -> Result<()> {
        let mut start = BytesStart::new("email");
        start.push_attribute(("id", email.id.as_str()));
        start.push_attribute(("domain", email.domain.as_str()));
        self.writer.write_event(Event::Empty(start))?;
        Ok(())
    }

    fn emit_copyright(&mut self, copyright: &Copyright) -> Result<()> {
        let mut start = BytesStart::new("copyright");
        start.push_attribute(("author", copyright.author.as_str()));
        if copyright.year.is_none() && copyright.license.is_none() {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        self.writer.write_event(Event::Start(start))?;
        if let Some(year) = &copyright.year {
            self.emit_text_element("year", &year.to_string())?;
        }
        if let Some(license) = &copyright.license {
            self.emit_text_element("license", license)?;
        }
        self.writer
            .write_event(Event::End(BytesEnd::new("copyright")))?;
        Ok(())
    }

    fn emit_bounds(&mut self, bounds: &Bounds) -> Result<()> {
        let mut start = BytesStart::new("bounds");
        start.push_attribute(("minlat", format_f64(bounds.min_lat.get()).as_str()));
        start.push_attribute(("minlon", format_f64(bounds.min_lon.get()).as_str()));
        start.push_attribute(("maxlat", format_f64(bounds.max_lat.get()).as_str()));
        start.push_attribute(("maxlon", format_f64(bounds.max_lon.get()).as_str()));
        self.writer.write_event(Event::Empty(start))?;
        Ok(())
    }

    fn emit_link(&mut self, link: &Link) -> Result<()> {
        let mut start = BytesStart::new("link");
        start.push_attribute(("href", link.href.as_str()));
        if link.text.is_none() && link.kind.is_none() {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        self.writer.write_event(Event::Start(start))?;
        if let Some(text) = &link.text {
            self.emit_text_element("text", text)?;
        }
        if let Some(kind) = &link.kind {
            self.emit_text_element("type", kind)?;
        }
        self.writer.write_event(Event::End(BytesEnd::new("link")))?;
        Ok(())
    }

    fn emit_waypoint(&mut self, point: &Waypoint, kind: PointKind) -> Result<()> {
        let tag = kind.element();
        let mut start = BytesStart::new(tag);
        start.push_attribute(("lat", format_f64(point.lat().get()).as_str()));
        start.push_attribute(("lon", format_f64(point.lon().get()).as_str()));
        if point.is_bare() {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        self.writer.write_event(Event::Start(start))?;

        if let Some(ele) = point.ele() {
            self.emit_text_element("ele", &format_f64(ele))?;
        }
        if let Some(time) = point.time() {
            self.emit_text_element("time", &format_time(time))?;
        }
        if let Some(magvar) = point.magvar() {
            self.emit_text_element("magvar", &format_f64(magvar.get()))?;
        }
        if let Some(geoidheight) = point.geoidheight() {
            self.emit_text_element("geoidheight", &format_f64(geoidheight))?;
        }
        if let Some(name) = point.name() {
            self.emit_text_element("name", name)?;
        }
        if let Some(cmt) = point.cmt() {
            self.emit_text_element("cmt", cmt)?;
        }
        if let Some(desc) = point.desc() {
            self.emit_text_element("desc", desc)?;
        }
        if let Some(src) = point.src() {
            self.emit_text_element("src", src)?;
        }
        for link in point.links() {
            self.emit_link(link)?;
        }
        if let Some(sym) = point.sym() {
            self.emit_text_element("sym", sym)?;
        }
        if let Some(kind_text) = point.kind() {
            self.emit_text_element("type", kind_text)?;
        }
        if let Some(fix) = point.fix() {
            self.emit_text_element("fix", fix.token())?;
        }
        if let Some(sat) = point.sat() {
            self.emit_text_element("sat", &sat.to_string())?;
        }
        if let Some(hdop) = point.hdop() {
            self.emit_text_element("hdop", &format_f64(hdop))?;
        }
        if let Some(vdop) = point.vdop() {
            self.emit_text_element("vdop", &format_f64(vdop))?;
        }
        if let Some(pdop) = point.pdop() {
            self.emit_text_element("pdop", &format_f64(pdop))?;
        }
        if let Some(age) = point.ageofdgpsdata() {
            self.emit_text_element("ageofdgpsdata", &format_f64(age))?;
        }
        if let Some(dgpsid) = point.dgpsid() {
            self.emit_text_element("dgpsid", &dgpsid.get().to_string())?;
        }
        if let Some(payload) = point.extensions() {
            let content = kind.write_hook(self.hooks, payload);
            self.emit_extensions(&content)?;
        }

        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    fn emit_route(&mut self, route: &Route) -> Result<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new("rte")))?;
        if let Some(name) = &route.name {
            self.emit_text_element("name", name)?;
        }
        if let Some(cmt) = &route.cmt {
            self.emit_text_element("cmt", cmt)?;
        }
        if let Some(desc) = &route.desc {
            self.emit_text_element("desc", desc)?;
        }
        if let Some(src) = &route.src {
            self.emit_text_element("src", src)?;
        }
        for link in &route.links {
            self.emit_link(link)?;
        }
        if let Some(number) = route.number {
            self.emit_text_element("number", &number.to_string())?;
        }
        if let Some(kind) = &route.kind {
            self.emit_text_element("type", kind)?;
        }
        if let Some(payload) = &route.extensions {
            let content = self.hooks.write_route(payload);
            self.emit_extensions(&content)?;
        }
        for point in route.points.iter() {
            self.emit_waypoint(&point, PointKind::RoutePoint)?;
        }
        self.writer.write_event(Event::End(BytesEnd::new("rte")))?;
        Ok(())
    }

    fn emit_track(&mut self, track: &Track) -> Result<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new("trk")))?;
        if let Some(name) = &track.name {
            self.emit_text_element("name", name)?;
        }
        if let Some(cmt) = &track.cmt {
            self.emit_text_element("cmt", cmt)?;
        }
        if let Some(desc) = &track.desc {
            self.emit_text_element("desc", desc)?;
        }
        if let Some(src) = &track.src {
            self.emit_text_element("src", src)?;
        }
        for link in &track.links {
            self.emit_link(link)?;
        }
        if let Some(number) = track.number {
            self.emit_text_element("number", &number.to_string())?;
        }
        if let Some(kind) = &track.kind {
            self.emit_text_element("type", kind)?;
        }
        if let Some(payload) = &track.extensions {
            let content = self.hooks.write_track(payload);
            self.emit_extensions(&content)?;
        }
        for segment in &track.segments {
            self.emit_segment(segment)?;
        }
        self.writer.write_event(Event::End(BytesEnd::new("trk")))?;
        Ok(())
    }

    fn emit_segment(&mut self, segment: &TrackSegment) -> Result<()> {
        if segment.points.is_empty() && segment.extensions.is_none() {
            self.writer
                .write_event(Event::Empty(BytesStart::new("trkseg")))?;
            return Ok(());
        }
        self.writer
            .write_event(Event::Start(BytesStart::new("trkseg")))?;
        for point in segment.points.iter() {
            self.emit_waypoint(&point, PointKind::TrackPoint)?;
        }
        if let Some(payload) = &segment.extensions {
            let content = self.hooks.write_track_segment(payload);
            self.emit_extensions(&content)?;
        }
        self.writer
            .write_event(Event::End(BytesEnd::new("trkseg")))?;
        Ok(())
    }

    /// Emit an `<extensions>` container with its raw content replayed
    /// verbatim, or nothing when the hook produced no content.
    fn emit_extensions(&mut self, content: &Extensions) -> Result<()> {
        if content.is_empty() {
            return Ok(());
        }
        let raw = suppress_duplicate_namespaces(content.as_str(), &self.options.namespaces);
        self.writer
            .write_event(Event::Start(BytesStart::new("extensions")))?;
        self.writer.get_mut().write_all(raw.as_bytes())?;
        self.writer
            .write_event(Event::End(BytesEnd::new("extensions")))?;
        Ok(())
    }

    fn emit_text_element(&mut self, tag: &str, text: &str) -> Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(tag)))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }
}

/// The one textual form timestamps take on output.
fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Strip namespace declarations from an extension fragment when the same
/// binding is already declared on the root element.
///
/// Only start and empty-element tags are rewritten; text content, end tags,
/// comments, and processing instructions pass through untouched even when
/// they happen to contain a matching substring.
fn suppress_duplicate_namespaces(raw: &str, bindings: &[(String, String)]) -> String {
    if bindings.is_empty() {
        return raw.to_string();
    }
    let mut decls = Vec::with_capacity(bindings.len() * 2);
    for (prefix, uri) in bindings {
        for quote in ['"', '\''] {
            decls.push(format!(" xmlns:{prefix}={quote}{uri}{quote}"));
        }
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        rest = &rest[open..];
        let Some(end) = tag_end(rest) else {
            break;
        };
        let tag = &rest[..end];
        if tag.starts_with("</") || tag.starts_with("<!") || tag.starts_with("<?") {
            out.push_str(tag);
        } else {
            let mut tag = tag.to_string();
            for decl in &decls {
                if tag.contains(decl.as_str()) {
                    tag = tag.replace(decl.as_str(), "");
                }
            }
            out.push_str(&tag);
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// Byte index one past the closing `>` of the tag `s` starts with, honoring
/// quoted attribute values that may contain `>`.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in s.char_indices() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '>' => return Some(i + 1),
                _ => {}
            },
        }
    }
    None
}
