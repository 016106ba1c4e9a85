//! Geometry module - polygon rings and spatial references

use std::fmt;

/// Spatial reference identified by its well-known id (EPSG / Esri WKID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpatialReference {
    /// Well-known id, e.g. 4326 for geographic WGS84
    pub wkid: u32,
}

impl SpatialReference {
    /// Geographic WGS84 (longitude/latitude in degrees)
    pub const WGS84: SpatialReference = SpatialReference { wkid: 4326 };

    /// Geographic NAD83 (longitude/latitude in degrees)
    pub const NAD83: SpatialReference = SpatialReference { wkid: 4269 };

    /// Spherical Web Mercator (meters)
    pub const WEB_MERCATOR: SpatialReference = SpatialReference { wkid: 3857 };

    /// Esri's legacy id for Web Mercator, still reported by many feature layers
    pub const WEB_MERCATOR_ESRI: SpatialReference = SpatialReference { wkid: 102100 };

    /// Create a spatial reference from a well-known id
    pub fn new(wkid: u32) -> Self {
        Self { wkid }
    }

    /// Whether two references describe the same coordinate system.
    ///
    /// Treats the Esri and EPSG Web Mercator ids as equivalent.
    pub fn same_as(&self, other: &SpatialReference) -> bool {
        self.canonical() == other.canonical()
    }

    fn canonical(&self) -> u32 {
        match self.wkid {
            102100 | 102113 | 900913 => 3857,
            wkid => wkid,
        }
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wkid:{}", self.wkid)
    }
}

/// A single coordinate pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Easting or longitude
    pub x: f64,
    /// Northing or latitude
    pub y: f64,
}

impl Point {
    /// Create a point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An ordered list of points forming one polygon boundary
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ring {
    /// Points in the order they were encountered
    pub points: Vec<Point>,
}

impl Ring {
    /// Create a ring from points
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Number of points in the ring
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the ring has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points as `[x, y]` pairs, the layout used by Esri JSON rings
    pub fn to_pairs(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.x, p.y]).collect()
    }
}

/// Polygon geometry: rings that all share one spatial reference
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Rings in document order
    pub rings: Vec<Ring>,

    /// Spatial reference of every point in every ring
    pub spatial_reference: SpatialReference,
}

impl Geometry {
    /// Create a geometry
    pub fn new(rings: Vec<Ring>, spatial_reference: SpatialReference) -> Self {
        Self {
            rings,
            spatial_reference,
        }
    }

    /// Geometry without rings
    pub fn empty(spatial_reference: SpatialReference) -> Self {
        Self::new(Vec::new(), spatial_reference)
    }

    /// Whether the geometry has no rings
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Total number of points across all rings
    pub fn point_count(&self) -> usize {
        self.rings.iter().map(Ring::len).sum()
    }
}
