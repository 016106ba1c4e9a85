//! Coordinate reprojection between spatial references

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use ocgis_domain::{Geometry, Point, Ring, SpatialReference};
use proj4rs::proj::Proj;
use std::collections::BTreeMap;

/// Built-in proj definitions by WKID
fn builtin_definition(wkid: u32) -> Option<&'static str> {
    match wkid {
        4326 => Some("+proj=longlat +datum=WGS84 +no_defs"),
        4269 => Some("+proj=longlat +datum=NAD83 +no_defs"),
        3857 | 102100 | 102113 | 900913 => Some(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs",
        ),
        _ => None,
    }
}

/// A resolved coordinate system
#[derive(Debug, Clone, PartialEq)]
struct Crs {
    reference: SpatialReference,
    definition: String,
    geographic: bool,
}

impl Crs {
    fn resolve(
        reference: SpatialReference,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Self, ExtractorError> {
        let definition = overrides
            .get(&reference.wkid.to_string())
            .map(String::as_str)
            .or_else(|| builtin_definition(reference.wkid))
            .ok_or_else(|| {
                ExtractorError::Projection(format!("no definition for {}", reference))
            })?
            .to_string();

        let geographic = definition
            .split_whitespace()
            .any(|token| token == "+proj=longlat" || token == "+proj=latlong");

        let crs = Self {
            reference,
            definition,
            geographic,
        };
        crs.proj()?;
        Ok(crs)
    }

    fn proj(&self) -> Result<Proj, ExtractorError> {
        Proj::from_proj_string(&self.definition).map_err(|e| {
            ExtractorError::Projection(format!("{} ('{}'): {}", self.reference, self.definition, e))
        })
    }
}

/// Transforms ring coordinates from a source to a target spatial reference.
///
/// Every point maps to exactly one point; ring order and point order are
/// preserved. A point that cannot be transformed fails the whole call rather
/// than being dropped. Geographic coordinates are in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Reprojector {
    source: Crs,
    target: Crs,
}

impl Reprojector {
    /// Resolve both spatial references; `overrides` maps WKID → proj string
    pub fn new(
        source: SpatialReference,
        target: SpatialReference,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Self, ExtractorError> {
        Ok(Self {
            source: Crs::resolve(source, overrides)?,
            target: Crs::resolve(target, overrides)?,
        })
    }

    /// Create a reprojector from the extractor configuration
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ExtractorError> {
        Self::new(
            SpatialReference::new(config.source_wkid),
            SpatialReference::new(config.target_wkid),
            &config.proj_overrides,
        )
    }

    /// Source spatial reference
    pub fn source(&self) -> SpatialReference {
        self.source.reference
    }

    /// Target spatial reference
    pub fn target(&self) -> SpatialReference {
        self.target.reference
    }

    /// The reprojector going the other way
    pub fn inverse(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }

    fn is_identity(&self) -> bool {
        self.source.reference.same_as(&self.target.reference)
            && self.source.definition == self.target.definition
    }

    /// Transform every point of every ring
    pub fn reproject(&self, rings: &[Ring]) -> Result<Vec<Ring>, ExtractorError> {
        if self.is_identity() {
            return Ok(rings.to_vec());
        }

        let src = self.source.proj()?;
        let dst = self.target.proj()?;

        rings
            .iter()
            .map(|ring| {
                ring.points
                    .iter()
                    .map(|p| self.transform_point(&src, &dst, *p))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Ring::new)
            })
            .collect()
    }

    /// Transform a geometry expressed in the source spatial reference
    pub fn reproject_geometry(&self, geometry: &Geometry) -> Result<Geometry, ExtractorError> {
        if !geometry.spatial_reference.same_as(&self.source.reference) {
            return Err(ExtractorError::Projection(format!(
                "geometry is in {}, expected {}",
                geometry.spatial_reference, self.source.reference
            )));
        }
        Ok(Geometry::new(
            self.reproject(&geometry.rings)?,
            self.target.reference,
        ))
    }

    fn transform_point(&self, src: &Proj, dst: &Proj, p: Point) -> Result<Point, ExtractorError> {
        let mut xyz = if self.source.geographic {
            (p.x.to_radians(), p.y.to_radians(), 0.0)
        } else {
            (p.x, p.y, 0.0)
        };

        proj4rs::transform::transform(src, dst, &mut xyz).map_err(|e| {
            ExtractorError::Projection(format!("({}, {}): {}", p.x, p.y, e))
        })?;

        let (x, y) = if self.target.geographic {
            (xyz.0.to_degrees(), xyz.1.to_degrees())
        } else {
            (xyz.0, xyz.1)
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(ExtractorError::Projection(format!(
                "({}, {}) has no image in {}",
                p.x, p.y, self.target.reference
            )));
        }
        Ok(Point::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wgs84_to_mercator() -> Reprojector {
        Reprojector::new(
            SpatialReference::WGS84,
            SpatialReference::WEB_MERCATOR,
            &BTreeMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_mercator_known_point() {
        let rings = vec![Ring::new(vec![Point::new(-93.6, 41.6)])];
        let out = wgs84_to_mercator().reproject(&rings).unwrap();
        let p = out[0].points[0];

        // x = R * lon
        let expected_x = 6378137.0 * (-93.6f64).to_radians();
        assert!((p.x - expected_x).abs() < 1.0, "x = {}", p.x);
        assert!(p.y > 5.0e6 && p.y < 5.2e6, "y = {}", p.y);
    }

    #[test]
    fn test_preserves_shape() {
        let rings = vec![
            Ring::new(vec![Point::new(-93.6, 41.6), Point::new(-93.5, 41.7)]),
            Ring::new(vec![Point::new(-91.0, 42.0)]),
            Ring::default(),
        ];
        let out = wgs84_to_mercator().reproject(&rings).unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(
            out.iter().map(Ring::len).collect::<Vec<_>>(),
            vec![2, 1, 0]
        );
    }

    #[test]
    fn test_identity_for_equivalent_wkids() {
        let r = Reprojector::new(
            SpatialReference::WEB_MERCATOR,
            SpatialReference::WEB_MERCATOR_ESRI,
            &BTreeMap::new(),
        )
        .unwrap();
        let rings = vec![Ring::new(vec![Point::new(1.5, 2.5)])];
        assert_eq!(r.reproject(&rings).unwrap(), rings);
    }

    #[test]
    fn test_unknown_wkid() {
        let err = Reprojector::new(
            SpatialReference::WGS84,
            SpatialReference::new(26915),
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractorError::Projection(_)));
    }

    #[test]
    fn test_override_definition() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "26915".to_string(),
            "+proj=utm +zone=15 +datum=NAD83 +units=m +no_defs".to_string(),
        );
        let r = Reprojector::new(SpatialReference::WGS84, SpatialReference::new(26915), &overrides)
            .unwrap();
        let out = r
            .reproject(&[Ring::new(vec![Point::new(-93.0, 42.0)])])
            .unwrap();

        // Central meridian of zone 15 sits at the false easting
        assert!((out[0].points[0].x - 500_000.0).abs() < 1.0);
    }

    #[test]
    fn test_geometry_reference_checked() {
        let r = wgs84_to_mercator();
        let geometry = Geometry::new(vec![], SpatialReference::NAD83);
        assert!(r.reproject_geometry(&geometry).is_err());

        let geometry = Geometry::new(vec![], SpatialReference::WGS84);
        assert_eq!(
            r.reproject_geometry(&geometry).unwrap().spatial_reference,
            SpatialReference::WEB_MERCATOR
        );
    }

    proptest::proptest! {
        #[test]
        fn prop_round_trip(
            points in proptest::collection::vec((-179.0f64..179.0, -80.0f64..80.0), 1..8),
        ) {
            let forward = wgs84_to_mercator();
            let ring = Ring::new(points.iter().map(|(x, y)| Point::new(*x, *y)).collect());

            let there = forward.reproject(std::slice::from_ref(&ring)).unwrap();
            let back = forward.inverse().reproject(&there).unwrap();

            proptest::prop_assert_eq!(back[0].len(), ring.len());
            for (a, b) in ring.points.iter().zip(&back[0].points) {
                proptest::prop_assert!((a.x - b.x).abs() < 1e-6);
                proptest::prop_assert!((a.y - b.y).abs() < 1e-6);
            }
        }
    }
}
