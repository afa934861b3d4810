//! Column-oriented immutable storage for large waypoint sequences.
//!
//! A route or track segment often carries thousands of points where most
//! optional fields never appear. Storing those points row-wise pays for every
//! absent field on every point; storing them as one column per field lets a
//! field that no point uses cost nothing at all.

use chrono::{DateTime, Utc};

use crate::extensions::Extensions;
use crate::model::{Link, Waypoint, WaypointExtras};
use crate::types::{Degrees, DgpsStation, Fix, Latitude, Longitude};

/// Placeholder stored in the absent slots of a densified column.
trait Fill: Clone {
    fn fill() -> Self;
}

impl Fill for f64 {
    fn fill() -> Self {
        0.0
    }
}
impl Fill for u32 {
    fn fill() -> Self {
        0
    }
}
impl Fill for String {
    fn fill() -> Self {
        String::new()
    }
}
impl Fill for Vec<Link> {
    fn fill() -> Self {
        Vec::new()
    }
}
impl Fill for DateTime<Utc> {
    fn fill() -> Self {
        DateTime::UNIX_EPOCH
    }
}
impl Fill for Fix {
    fn fill() -> Self {
        Fix::None
    }
}
impl Fill for Degrees {
    fn fill() -> Self {
        Degrees::default()
    }
}
impl Fill for DgpsStation {
    fn fill() -> Self {
        DgpsStation::default()
    }
}
impl Fill for Extensions {
    fn fill() -> Self {
        Extensions::default()
    }
}

/// One optional per-waypoint field, stored columnwise.
///
/// A column no row uses stays `AllUnset`. Once any row supplies a value the
/// column is densified: one presence flag per row plus one value per row,
/// with absent rows holding a placeholder behind a false flag.
#[derive(Debug, Clone, PartialEq)]
enum Column<T> {
    AllUnset,
    Dense {
        present: Box<[bool]>,
        values: Box<[T]>,
    },
}

impl<T> Default for Column<T> {
    fn default() -> Self {
        Column::AllUnset
    }
}

impl<T: Clone> Column<T> {
    fn get(&self, index: usize) -> Option<T> {
        match self {
            Column::AllUnset => None,
            Column::Dense { present, values } => present[index].then(|| values[index].clone()),
        }
    }
}

#[derive(Debug, Clone)]
enum ColumnBuilder<T> {
    AllUnset,
    Dense { present: Vec<bool>, values: Vec<T> },
}

impl<T> Default for ColumnBuilder<T> {
    fn default() -> Self {
        ColumnBuilder::AllUnset
    }
}

impl<T: Fill> ColumnBuilder<T> {
    fn push(&mut self, rows_before: usize, value: Option<T>) {
        match (&mut *self, value) {
            (ColumnBuilder::AllUnset, None) => {}
            (ColumnBuilder::AllUnset, Some(v)) => {
                // First occupied row: densify and backfill every earlier row
                // as absent.
                let mut present = vec![false; rows_before];
                let mut values = vec![T::fill(); rows_before];
                present.push(true);
                values.push(v);
                *self = ColumnBuilder::Dense { present, values };
            }
            (ColumnBuilder::Dense { present, values }, v) => {
                present.push(v.is_some());
                values.push(v.unwrap_or_else(T::fill));
            }
        }
    }

    fn finish(self) -> Column<T> {
        match self {
            ColumnBuilder::AllUnset => Column::AllUnset,
            ColumnBuilder::Dense { present, values } => Column::Dense {
                present: present.into_boxed_slice(),
                values: values.into_boxed_slice(),
            },
        }
    }
}

/// An immutable, fixed-length waypoint sequence stored one column per field.
///
/// Coordinates are always dense; every optional column is either fully
/// absent or presence-flagged at the full row count. Safe for unsynchronized
/// concurrent reads: nothing can mutate it after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointTable {
    lat: Box<[Latitude]>,
    lon: Box<[Longitude]>,
    ele: Column<f64>,
    time: Column<DateTime<Utc>>,
    magvar: Column<Degrees>,
    geoidheight: Column<f64>,
    name: Column<String>,
    cmt: Column<String>,
    desc: Column<String>,
    src: Column<String>,
    links: Column<Vec<Link>>,
    sym: Column<String>,
    kind: Column<String>,
    fix: Column<Fix>,
    sat: Column<u32>,
    hdop: Column<f64>,
    vdop: Column<f64>,
    pdop: Column<f64>,
    ageofdgpsdata: Column<f64>,
    dgpsid: Column<DgpsStation>,
    extensions: Column<Extensions>,
}

impl WaypointTable {
    pub fn from_waypoints(points: impl IntoIterator<Item = Waypoint>) -> Self {
        let mut builder = WaypointTableBuilder::new();
        for point in points {
            builder.push(point);
        }
        builder.finish()
    }

    pub fn len(&self) -> usize {
        self.lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    /// Reconstruct row `index` from the columns. Absent columns contribute
    /// the absent value for their field.
    pub fn get(&self, index: usize) -> Option<Waypoint> {
        if index >= self.lat.len() {
            return None;
        }
        let extras = WaypointExtras {
            ele: self.ele.get(index),
            time: self.time.get(index),
            magvar: self.magvar.get(index),
            geoidheight: self.geoidheight.get(index),
            name: self.name.get(index),
            cmt: self.cmt.get(index),
            desc: self.desc.get(index),
            src: self.src.get(index),
            links: self.links.get(index).unwrap_or_default(),
            sym: self.sym.get(index),
            kind: self.kind.get(index),
            fix: self.fix.get(index),
            sat: self.sat.get(index),
            hdop: self.hdop.get(index),
            vdop: self.vdop.get(index),
            pdop: self.pdop.get(index),
            ageofdgpsdata: self.ageofdgpsdata.get(index),
            dgpsid: self.dgpsid.get(index),
            extensions: self.extensions.get(index),
        };
        let extras = if extras.is_empty() {
            None
        } else {
            Some(Box::new(extras))
        };
        Some(Waypoint::from_parts(self.lat[index], self.lon[index], extras))
    }

    /// A restartable cursor over the rows in index order.
    pub fn iter(&self) -> WaypointIter<'_> {
        WaypointIter {
            table: self,
            index: 0,
        }
    }
}

impl<'a> IntoIterator for &'a WaypointTable {
    type Item = Waypoint;
    type IntoIter = WaypointIter<'a>;

    fn into_iter(self) -> WaypointIter<'a> {
        self.iter()
    }
}

impl FromIterator<Waypoint> for WaypointTable {
    fn from_iter<I: IntoIterator<Item = Waypoint>>(iter: I) -> Self {
        WaypointTable::from_waypoints(iter)
    }
}

/// Index cursor over a [`WaypointTable`]; each step reconstructs one row.
pub struct WaypointIter<'a> {
    table: &'a WaypointTable,
    index: usize,
}

impl Iterator for WaypointIter<'_> {
    type Item = Waypoint;

    fn next(&mut self) -> Option<Waypoint> {
        let point = self.table.get(self.index)?;
        self.index += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WaypointIter<'_> {}

/// Single-pass, append-only constructor for [`WaypointTable`]. Optional
/// columns are allocated lazily the first time a pushed point uses them.
#[derive(Debug, Default)]
pub struct WaypointTableBuilder {
    lat: Vec<Latitude>,
    lon: Vec<Longitude>,
    ele: ColumnBuilder<f64>,
    time: ColumnBuilder<DateTime<Utc>>,
    magvar: ColumnBuilder<Degrees>,
    geoidheight: ColumnBuilder<f64>,
    name: ColumnBuilder<String>,
    cmt: ColumnBuilder<String>,
    desc: ColumnBuilder<String>,
    src: ColumnBuilder<String>,
    links: ColumnBuilder<Vec<Link>>,
    sym: ColumnBuilder<String>,
    kind: ColumnBuilder<String>,
    fix: ColumnBuilder<Fix>,
    sat: ColumnBuilder<u32>,
    hdop: ColumnBuilder<f64>,
    vdop: ColumnBuilder<f64>,
    pdop: ColumnBuilder<f64>,
    ageofdgpsdata: ColumnBuilder<f64>,
    dgpsid: ColumnBuilder<DgpsStation>,
    extensions: ColumnBuilder<Extensions>,
}

impl WaypointTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    pub fn push(&mut self, point: Waypoint) {
        let rows_before = self.lat.len();
        let (lat, lon, extras) = point.into_parts();
        self.lat.push(lat);
        self.lon.push(lon);
        let extras = extras.map(|boxed| *boxed).unwrap_or_default();
        self.ele.push(rows_before, extras.ele);
        self.time.push(rows_before, extras.time);
        self.magvar.push(rows_before, extras.magvar);
        self.geoidheight.push(rows_before, extras.geoidheight);
        self.name.push(rows_before, extras.name);
        self.cmt.push(rows_before, extras.cmt);
        self.desc.push(rows_before, extras.desc);
        self.src.push(rows_before, extras.src);
        let links = if extras.links.is_empty() {
            None
        } else {
            Some(extras.links)
        };
        self.links.push(rows_before, links);
        self.sym.push(rows_before, extras.sym);
        self.kind.push(rows_before, extras.kind);
        self.fix.push(rows_before, extras.fix);
        self.sat.push(rows_before, extras.sat);
        self.hdop.push(rows_before, extras.hdop);
        self.vdop.push(rows_before, extras.vdop);
        self.pdop.push(rows_before, extras.pdop);
        self.ageofdgpsdata.push(rows_before, extras.ageofdgpsdata);
        self.dgpsid.push(rows_before, extras.dgpsid);
        self.extensions.push(rows_before, extras.extensions);
    }

    /// Freeze every column at the final row count.
    pub fn finish(self) -> WaypointTable {
        WaypointTable {
            lat: self.lat.into_boxed_slice(),
            lon: self.lon.into_boxed_slice(),
            ele: self.ele.finish(),
            time: self.time.finish(),
            magvar: self.magvar.finish(),
            geoidheight: self.geoidheight.finish(),
            name: self.name.finish(),
            cmt: self.cmt.finish(),
            desc: self.desc.finish(),
            src: self.src.finish(),
            links: self.links.finish(),
            sym: self.sym.finish(),
            kind: self.kind.finish(),
            fix: self.fix.finish(),
            sat: self.sat.finish(),
            hdop: self.hdop.finish(),
            vdop: self.vdop.finish(),
            pdop: self.pdop.finish(),
            ageofdgpsdata: self.ageofdgpsdata.finish(),
            dgpsid: self.dgpsid.finish(),
            extensions: self.extensions.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Latitude, Longitude};

    fn point(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(Latitude::new(lat).unwrap(), Longitude::new(lon).unwrap())
    }

    #[test]
    fn test_empty_table() {
        let table = WaypointTable::default();
        assert_eq!(table.len(), 0);
        assert!(table.is_empty());
        assert!(table.get(0).is_none());
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn test_bare_points_round_trip() {
        let table = WaypointTable::from_waypoints((0..5).map(|i| point(f64::from(i), 100.0)));
        assert_eq!(table.len(), 5);
        for i in 0..5 {
            let row = table.get(i).unwrap();
            assert!(row.is_bare());
            assert_eq!(row.lat().get(), i as f64);
            assert_eq!(row.lon().get(), 100.0);
        }
    }

    #[test]
    fn test_single_row_densifies_with_backfill() {
        // Only row 2 of 5 carries a name; every other row must report the
        // field absent and row 2 must reconstruct exactly.
        let points: Vec<Waypoint> = (0..5)
            .map(|i| {
                let mut wp = point(f64::from(i), 10.0);
                if i == 2 {
                    wp.set_name("the one");
                }
                wp
            })
            .collect();
        let table = WaypointTable::from_waypoints(points);
        for i in 0..5 {
            let row = table.get(i).unwrap();
            if i == 2 {
                assert_eq!(row.name(), Some("the one"));
            } else {
                assert_eq!(row.name(), None);
            }
        }
    }

    #[test]
    fn test_row_reconstruction_is_exact() {
        let mut wp = point(35.6762, 139.6503);
        wp.set_ele(40.5).unwrap();
        wp.set_name("Tokyo Tower");
        wp.set_fix(Fix::ThreeD);
        wp.set_sat(9);
        wp.set_dgpsid(DgpsStation::new(7).unwrap());
        wp.add_link(Link::new("https://example.com"));

        let table = WaypointTable::from_waypoints([point(0.0, 0.0), wp.clone(), point(1.0, 1.0)]);
        assert_eq!(table.get(1).unwrap(), wp);
        assert!(table.get(0).unwrap().is_bare());
        assert!(table.get(2).unwrap().is_bare());
    }

    #[test]
    fn test_iter_is_restartable() {
        let table = WaypointTable::from_waypoints([point(1.0, 2.0), point(3.0, 4.0)]);
        let first: Vec<_> = table.iter().collect();
        let second: Vec<_> = table.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(table.iter().len(), 2);
    }

    #[test]
    fn test_builder_incremental() {
        let mut builder = WaypointTableBuilder::new();
        assert!(builder.is_empty());
        builder.push(point(1.0, 1.0));
        let mut named = point(2.0, 2.0);
        named.set_cmt("checkpoint");
        builder.push(named);
        assert_eq!(builder.len(), 2);
        let table = builder.finish();
        assert_eq!(table.get(0).unwrap().cmt(), None);
        assert_eq!(table.get(1).unwrap().cmt(), Some("checkpoint"));
    }

    #[test]
    fn test_from_iterator() {
        let table: WaypointTable = [point(1.0, 2.0)].into_iter().collect();
        assert_eq!(table.len(), 1);
    }
}
