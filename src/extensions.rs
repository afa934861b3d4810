//! Caller-opaque extension payloads and the hook protocol that carries them
//! through a read/write cycle untouched.

/// Verbatim inner XML of one `<extensions>` container.
///
/// The core never interprets this content; it is captured on read and
/// replayed on write exactly as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions(String);

impl Extensions {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when there is nothing to emit; an empty payload suppresses the
    /// `<extensions>` container on write.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for Extensions {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Per-entity callbacks for capturing and re-emitting extension content.
///
/// On read, each hook receives the raw content found under that entity's
/// `<extensions>` container and returns the payload to store (`None` stores
/// nothing). On write, each hook receives the stored payload and returns the
/// content to emit; empty output suppresses the container. Every method
/// defaults to identity, which is what makes schema-blind round-tripping
/// work with no caller customization at all.
pub trait ExtensionHooks {
    fn read_document(&self, raw: Extensions) -> Option<Extensions> {
        Some(raw)
    }
    fn read_metadata(&self, raw: Extensions) -> Option<Extensions> {
        Some(raw)
    }
    fn read_waypoint(&self, raw: Extensions) -> Option<Extensions> {
        Some(raw)
    }
    fn read_route(&self, raw: Extensions) -> Option<Extensions> {
        Some(raw)
    }
    fn read_route_point(&self, raw: Extensions) -> Option<Extensions> {
        Some(raw)
    }
    fn read_track(&self, raw: Extensions) -> Option<Extensions> {
        Some(raw)
    }
    fn read_track_segment(&self, raw: Extensions) -> Option<Extensions> {
        Some(raw)
    }
    fn read_track_point(&self, raw: Extensions) -> Option<Extensions> {
        Some(raw)
    }

    fn write_document(&self, payload: &Extensions) -> Extensions {
        payload.clone()
    }
    fn write_metadata(&self, payload: &Extensions) -> Extensions {
        payload.clone()
    }
    fn write_waypoint(&self, payload: &Extensions) -> Extensions {
        payload.clone()
    }
    fn write_route(&self, payload: &Extensions) -> Extensions {
        payload.clone()
    }
    fn write_route_point(&self, payload: &Extensions) -> Extensions {
        payload.clone()
    }
    fn write_track(&self, payload: &Extensions) -> Extensions {
        payload.clone()
    }
    fn write_track_segment(&self, payload: &Extensions) -> Extensions {
        payload.clone()
    }
    fn write_track_point(&self, payload: &Extensions) -> Extensions {
        payload.clone()
    }
}

/// The identity hook set: store what was read, replay what was stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl ExtensionHooks for DefaultHooks {}

/// Which flavor of point element is being processed; `wpt`, `rtept`, and
/// `trkpt` share a schema but dispatch to different hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PointKind {
    Waypoint,
    RoutePoint,
    TrackPoint,
}

impl PointKind {
    pub(crate) fn element(self) -> &'static str {
        match self {
            PointKind::Waypoint => "wpt",
            PointKind::RoutePoint => "rtept",
            PointKind::TrackPoint => "trkpt",
        }
    }

    pub(crate) fn read_hook(
        self,
        hooks: &dyn ExtensionHooks,
        raw: Extensions,
    ) -> Option<Extensions> {
        match self {
            PointKind::Waypoint => hooks.read_waypoint(raw),
            PointKind::RoutePoint => hooks.read_route_point(raw),
            PointKind::TrackPoint => hooks.read_track_point(raw),
        }
    }

    pub(crate) fn write_hook(self, hooks: &dyn ExtensionHooks, payload: &Extensions) -> Extensions {
        match self {
            PointKind::Waypoint => hooks.write_waypoint(payload),
            PointKind::RoutePoint => hooks.write_route_point(payload),
            PointKind::TrackPoint => hooks.write_track_point(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hooks_are_identity() {
        let hooks = DefaultHooks;
        let raw = Extensions::new("<custom:speed>5.5</custom:speed>");
        assert_eq!(hooks.read_waypoint(raw.clone()), Some(raw.clone()));
        assert_eq!(hooks.write_waypoint(&raw), raw);
    }

    #[test]
    fn test_empty_payload() {
        assert!(Extensions::default().is_empty());
        assert!(Extensions::new("  \n ").is_empty());
        assert!(!Extensions::new("<a/>").is_empty());
    }

    #[test]
    fn test_custom_hook_override() {
        struct Dropper;
        impl ExtensionHooks for Dropper {
            fn read_waypoint(&self, _raw: Extensions) -> Option<Extensions> {
                None
            }
        }
        let raw = Extensions::new("<a/>");
        assert_eq!(Dropper.read_waypoint(raw.clone()), None);
        // everything else stays identity
        assert_eq!(Dropper.read_route(raw.clone()), Some(raw));
    }
}
