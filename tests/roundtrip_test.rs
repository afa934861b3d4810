use chrono::FixedOffset;
use gpxio::{DefaultHooks, GpxEvent, ReadOptions, WriteOptions};

fn load_fixture(path: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{path}")).unwrap()
}

fn read(xml: &str) -> gpxio::Gpx {
    gpxio::read(xml, &ReadOptions::default(), &DefaultHooks)
        .unwrap()
        .unwrap()
}

fn write(gpx: &gpxio::Gpx) -> String {
    gpxio::write(gpx, &WriteOptions::default(), &DefaultHooks).unwrap()
}

/// Strip insignificant whitespace between tags so indented fixtures compare
/// equal to the writer's unindented output.
fn normalize(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut pending_ws = String::new();
    let mut in_ws = false;
    for ch in xml.chars() {
        if in_ws {
            if ch.is_whitespace() {
                pending_ws.push(ch);
                continue;
            }
            if ch != '<' {
                out.push_str(&pending_ws);
            }
            pending_ws.clear();
            in_ws = false;
        }
        out.push(ch);
        if ch == '>' {
            in_ws = true;
        }
    }
    out
}

fn assert_round_trip(path: &str) {
    let input = load_fixture(path);
    let first = write(&read(&input));
    assert_eq!(first, normalize(&input), "fixture {path} did not survive");

    // once canonical, output must be a fixed point of read-then-write
    let second = write(&read(&first));
    assert_eq!(first, second, "fixture {path} is not a fixed point");
}

// ---- basic/ ----

#[test]
fn test_01_minimal_waypoint_round_trip() {
    assert_round_trip("basic/01_minimal_waypoint.gpx");
}

#[test]
fn test_02_full_waypoint_round_trip() {
    assert_round_trip("basic/02_full_waypoint.gpx");
}

#[test]
fn test_02_full_waypoint_fields() {
    let gpx = read(&load_fixture("basic/02_full_waypoint.gpx"));
    let pt = &gpx.waypoints[0];
    assert_eq!(pt.name(), Some("Tokyo Tower"));
    assert_eq!(pt.ele(), Some(40.5));
    assert_eq!(pt.fix(), Some(gpxio::Fix::ThreeD));
    assert_eq!(pt.sat(), Some(9));
    assert_eq!(pt.dgpsid().unwrap().get(), 23);
    assert_eq!(pt.links()[0].text.as_deref(), Some("Tokyo Tower Website"));
}

#[test]
fn test_03_route_round_trip() {
    assert_round_trip("basic/03_route.gpx");

    let gpx = read(&load_fixture("basic/03_route.gpx"));
    assert_eq!(gpx.routes.len(), 1);
    let route = &gpx.routes[0];
    assert_eq!(route.name.as_deref(), Some("Morning Commute"));
    assert_eq!(route.number, Some(3));
    assert_eq!(route.points.len(), 3);
    assert_eq!(route.points.get(0).unwrap().name(), Some("Tokyo Station"));
    assert!(route.points.get(1).unwrap().is_bare());
    assert_eq!(route.points.get(2).unwrap().ele(), Some(5.25));
}

#[test]
fn test_04_track_round_trip_keeps_empty_segment() {
    assert_round_trip("basic/04_track.gpx");

    let gpx = read(&load_fixture("basic/04_track.gpx"));
    let track = &gpx.tracks[0];
    assert_eq!(track.segments.len(), 3);
    assert_eq!(track.segments[0].points.len(), 2);
    assert!(track.segments[1].points.is_empty());
    assert_eq!(track.segments[2].points.len(), 1);
}

#[test]
fn test_05_metadata_round_trip() {
    assert_round_trip("basic/05_metadata.gpx");

    let gpx = read(&load_fixture("basic/05_metadata.gpx"));
    let md = &gpx.metadata;
    assert_eq!(md.creator, "gpxio-test");
    assert_eq!(md.name.as_deref(), Some("Sample Collection"));
    assert_eq!(md.author.as_ref().unwrap().name.as_deref(), Some("Aki Tanaka"));
    assert_eq!(md.copyright.as_ref().unwrap().year.unwrap().year, 2025);
    assert_eq!(md.keywords.as_deref(), Some("hiking, tokyo"));
    assert_eq!(md.bounds.unwrap().min_lat.get(), 35.25);
}

// ---- edge/ ----

#[test]
fn test_06_near_zero_doubles_survive() {
    assert_round_trip("edge/06_near_zero.gpx");

    let gpx = read(&load_fixture("edge/06_near_zero.gpx"));
    let pt = &gpx.waypoints[0];
    assert_eq!(pt.lat().get(), 0.00001);
    assert_eq!(pt.lon().get(), -0.00001);
    assert_eq!(pt.ele(), Some(0.000001));

    // bit-exact across a full cycle, including the tiniest representable
    // magnitudes the writer must render without exponent notation
    let out = write(&gpx);
    let back = read(&out);
    assert_eq!(
        back.waypoints[0].lat().get().to_bits(),
        pt.lat().get().to_bits()
    );
    assert!(out.contains(r#"lat="0.00001""#), "{out}");
    assert!(out.contains("<ele>0.000001</ele>"), "{out}");
}

#[test]
fn test_07_extensions_round_trip_verbatim() {
    assert_round_trip("edge/07_extensions.gpx");

    let gpx = read(&load_fixture("edge/07_extensions.gpx"));
    assert_eq!(
        gpx.extensions.as_ref().unwrap().as_str(),
        r#"<app:note xmlns:app="urn:app">document level</app:note>"#
    );
    assert_eq!(
        gpx.metadata.extensions.as_ref().unwrap().as_str(),
        r#"<meta:source xmlns:meta="urn:meta">logger</meta:source>"#
    );
    let pt = gpx.tracks[0].segments[0].points.get(0).unwrap();
    assert_eq!(
        pt.extensions().unwrap().as_str(),
        r#"<tpx:hr xmlns:tpx="urn:tpx">142</tpx:hr>"#
    );
}

#[test]
fn test_08_multi_root_folds_into_one_document() {
    let gpx = read(&load_fixture("edge/08_multi_root.gpx"));
    // the 1.0 root is skipped; content of both accepted roots is folded
    assert_eq!(gpx.metadata.creator, "first-good");
    assert_eq!(gpx.waypoints.len(), 2);
    assert_eq!(gpx.waypoints[0].lat().get(), 2.5);
    assert_eq!(gpx.waypoints[1].lat().get(), 3.5);
    // the first accepted root had no metadata element, so the trivial
    // metadata won and the second root's element was dropped
    assert!(gpx.metadata.name.is_none());

    // the folded document is itself round-trippable
    let out = write(&gpx);
    assert_eq!(out, write(&read(&out)));
}

#[test]
fn test_09_missing_creator_policy() {
    let input = load_fixture("edge/09_no_creator.gpx");
    let none = gpxio::read(&input, &ReadOptions::default(), &DefaultHooks).unwrap();
    assert!(none.is_none());

    let opts = ReadOptions {
        default_creator: Some("gpxio-fallback".to_string()),
        ..Default::default()
    };
    let gpx = gpxio::read(&input, &opts, &DefaultHooks).unwrap().unwrap();
    assert_eq!(gpx.metadata.creator, "gpxio-fallback");
    assert_eq!(gpx.waypoints.len(), 1);
}

#[test]
fn test_10_offsetless_time_resolved_and_written_as_utc() {
    let input = load_fixture("edge/10_local_time.gpx");
    let opts = ReadOptions {
        reference_offset: Some(FixedOffset::east_opt(9 * 3600).unwrap()),
        ..Default::default()
    };
    let gpx = gpxio::read(&input, &opts, &DefaultHooks).unwrap().unwrap();
    let out = write(&gpx);
    assert!(out.contains("<time>2025-05-01T00:00:00Z</time>"), "{out}");
}

#[test]
fn test_streaming_matches_collected_read() {
    let input = load_fixture("basic/04_track.gpx");
    let mut events = Vec::new();
    gpxio::read_stream(&input, &ReadOptions::default(), &DefaultHooks, |event| {
        events.push(event);
    })
    .unwrap();

    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            GpxEvent::Metadata(_) => "metadata",
            GpxEvent::Waypoint(_) => "wpt",
            GpxEvent::Route(_) => "rte",
            GpxEvent::Track(_) => "trk",
            GpxEvent::Extensions(_) => "ext",
        })
        .collect();
    assert_eq!(kinds, ["trk", "metadata"]);

    let collected = read(&input);
    match &events[0] {
        GpxEvent::Track(track) => assert_eq!(*track, collected.tracks[0]),
        other => panic!("expected a track event, got {other:?}"),
    }
}

#[test]
fn test_namespace_binding_hoisted_to_root() {
    let input = load_fixture("edge/07_extensions.gpx");
    let gpx = read(&input);
    let opts = WriteOptions {
        namespaces: vec![("tpx".to_string(), "urn:tpx".to_string())],
    };
    let out = gpxio::write(&gpx, &opts, &DefaultHooks).unwrap();
    assert!(out.contains(r#"xmlns:tpx="urn:tpx""#));
    assert!(out.contains("<extensions><tpx:hr>142</tpx:hr></extensions>"), "{out}");

    // hoisting must not break the fixed-point property
    let back = gpxio::read(&out, &ReadOptions::default(), &DefaultHooks)
        .unwrap()
        .unwrap();
    let again = gpxio::write(&back, &opts, &DefaultHooks).unwrap();
    assert_eq!(out, again);
}
