//! Polygon ring extraction from the notice layout
//!
//! Notices print each polygon as a bold label ("Polygon 1") followed by one
//! block per vertex, e.g. `(41.58, -93.62)`. Anything else between labels
//! (remarks, blank lines, map links) is skipped.

use crate::config::{CoordinateOrder, ExtractorConfig};
use crate::document::{LayoutBlock, LayoutDocument};
use crate::types::Diagnostic;
use ocgis_domain::{Point, Ring};
use tracing::debug;

/// Rings found in a notice, in source coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingExtraction {
    /// Rings in header order, each with at least one point
    pub rings: Vec<Ring>,

    /// Dropped headers and similar anomalies
    pub diagnostics: Vec<Diagnostic>,
}

/// Walks ring headers and collects coordinate blocks under each
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryExtractor {
    order: CoordinateOrder,
}

impl GeometryExtractor {
    /// Create an extractor reading coordinates in the given axis order
    pub fn new(order: CoordinateOrder) -> Self {
        Self { order }
    }

    /// Create an extractor from the extractor configuration
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.geometry.coordinate_order)
    }

    /// Extract every non-empty ring
    pub fn extract_rings<D>(&self, doc: &D) -> RingExtraction
    where
        D: LayoutDocument + ?Sized,
    {
        // (header position, label, points)
        let mut found: Vec<(usize, String, Vec<Point>)> = Vec::new();

        for run in doc.sibling_runs() {
            self.collect_run(&run, &mut found);
        }
        found.sort_by_key(|(position, _, _)| *position);

        let mut out = RingExtraction::default();
        for (_, label, points) in found {
            if points.is_empty() {
                debug!(label = %label, "Ring header without coordinates");
                out.diagnostics.push(Diagnostic::RingWithoutPoints(label));
            } else {
                out.rings.push(Ring::new(points));
            }
        }
        out
    }

    fn collect_run(&self, run: &[LayoutBlock], found: &mut Vec<(usize, String, Vec<Point>)>) {
        let mut current: Option<usize> = None;

        for block in run {
            if block.is_label {
                found.push((block.position, block.text.clone(), Vec::new()));
                current = Some(found.len() - 1);
                continue;
            }
            let Some(idx) = current else {
                continue;
            };
            if let Some((a, b)) = parse_coordinate_pair(&block.text) {
                found[idx].2.push(self.point(a, b));
            }
        }
    }

    fn point(&self, a: f64, b: f64) -> Point {
        match self.order {
            CoordinateOrder::LatLon => Point::new(b, a),
            CoordinateOrder::LonLat => Point::new(a, b),
        }
    }
}

/// Parse "(a, b)" or "a, b" into two finite numbers
pub fn parse_coordinate_pair(text: &str) -> Option<(f64, f64)> {
    let stripped: String = text.chars().filter(|c| *c != '(' && *c != ')').collect();
    let mut tokens = stripped.split(',').map(str::trim);

    let a = tokens.next()?.parse::<f64>().ok()?;
    let b = tokens.next()?.parse::<f64>().ok()?;
    if tokens.next().is_some() || !a.is_finite() || !b.is_finite() {
        return None;
    }
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HtmlDocument;

    fn block(position: usize, text: &str, is_label: bool) -> LayoutBlock {
        LayoutBlock {
            position,
            text: text.to_string(),
            is_label,
        }
    }

    struct Runs(Vec<Vec<LayoutBlock>>);

    impl LayoutDocument for Runs {
        fn sibling_runs(&self) -> Vec<Vec<LayoutBlock>> {
            self.0.clone()
        }
    }

    #[test]
    fn test_parse_coordinate_pair() {
        assert_eq!(parse_coordinate_pair("(41.5, -93.6)"), Some((41.5, -93.6)));
        assert_eq!(parse_coordinate_pair(" 41.5 ,-93.6 "), Some((41.5, -93.6)));
        assert_eq!(parse_coordinate_pair("(1, 2, 3)"), None);
        assert_eq!(parse_coordinate_pair("(41.5)"), None);
        assert_eq!(parse_coordinate_pair("Lat, Lon"), None);
        assert_eq!(parse_coordinate_pair("(NaN, 1)"), None);
        assert_eq!(parse_coordinate_pair(""), None);
    }

    #[test]
    fn test_lat_lon_becomes_x_y() {
        let doc = Runs(vec![vec![
            block(0, "Polygon 1", true),
            block(1, "(41.5, -93.6)", false),
        ]]);
        let out = GeometryExtractor::new(CoordinateOrder::LatLon).extract_rings(&doc);
        assert_eq!(out.rings[0].points[0], Point::new(-93.6, 41.5));

        let out = GeometryExtractor::new(CoordinateOrder::LonLat).extract_rings(&doc);
        assert_eq!(out.rings[0].points[0], Point::new(41.5, -93.6));
    }

    #[test]
    fn test_empty_header_is_dropped() {
        let doc = Runs(vec![vec![
            block(0, "Polygon 1", true),
            block(1, "no coordinates here", false),
            block(2, "Polygon 2", true),
            block(3, "(1, 2)", false),
        ]]);
        let out = GeometryExtractor::default().extract_rings(&doc);

        assert_eq!(out.rings.len(), 1);
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::RingWithoutPoints("Polygon 1".to_string())]
        );
    }

    #[test]
    fn test_blocks_before_first_header_are_ignored() {
        let doc = Runs(vec![vec![block(0, "(1, 2)", false)]]);
        assert!(GeometryExtractor::default().extract_rings(&doc).rings.is_empty());
    }

    #[test]
    fn test_ring_order_follows_document_across_runs() {
        let doc = Runs(vec![
            vec![block(5, "B", true), block(6, "(3, 4)", false)],
            vec![block(1, "A", true), block(2, "(1, 2)", false)],
        ]);
        let out = GeometryExtractor::new(CoordinateOrder::LonLat).extract_rings(&doc);
        assert_eq!(out.rings[0].points[0], Point::new(1.0, 2.0));
        assert_eq!(out.rings[1].points[0], Point::new(3.0, 4.0));
    }

    #[test]
    fn test_html_layout() {
        let html = r#"
            <div class="section">
              <div><b>Polygon 1</b></div>
              <div>(41.60, -93.70)</div>
              <div>remark text</div>
              <div>(41.61, -93.70)</div>
              <div>(41.61, -93.71)</div>
              <div><strong>Polygon 2</strong></div>
              <div>(41.70, -93.80)</div>
            </div>"#;
        let doc = HtmlDocument::parse(html, "div").unwrap();
        let out = GeometryExtractor::default().extract_rings(&doc);

        assert_eq!(out.rings.len(), 2);
        assert_eq!(out.rings[0].len(), 3);
        assert_eq!(out.rings[1].len(), 1);
        assert_eq!(out.rings[0].points[2], Point::new(-93.71, 41.61));
    }

    #[test]
    fn test_nested_labels_start_new_rings() {
        let html = r#"
            <section>
              <div><b>Polygon 1</b></div>
              <div>(41.60, -93.70)</div>
              <div><span><b>Polygon 2</b></span></div>
              <div>(41.70, -93.80)</div>
              <div><font><strong>Polygon 3</strong></font></div>
              <div>(41.80, -93.90)</div>
            </section>"#;
        let doc = HtmlDocument::parse(html, "div, p").unwrap();
        let out = GeometryExtractor::default().extract_rings(&doc);

        assert_eq!(out.rings.len(), 3);
        assert!(out.rings.iter().all(|r| r.len() == 1));
        assert_eq!(out.rings[2].points[0], Point::new(-93.90, 41.80));
        assert!(out.diagnostics.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn prop_one_ring_per_header_with_points(
            rings in proptest::collection::vec(
                proptest::collection::vec((-90.0f64..90.0, -180.0f64..180.0), 0..5),
                1..5,
            ),
        ) {
            let mut run = Vec::new();
            for (i, points) in rings.iter().enumerate() {
                run.push(block(run.len(), &format!("Polygon {}", i + 1), true));
                run.push(block(run.len(), "See remarks", false));
                for (lat, lon) in points {
                    run.push(block(run.len(), &format!("({}, {})", lat, lon), false));
                }
            }

            let out = GeometryExtractor::default().extract_rings(&Runs(vec![run]));
            let expected: Vec<usize> = rings.iter().map(Vec::len).filter(|n| *n > 0).collect();
            let actual: Vec<usize> = out.rings.iter().map(Ring::len).collect();
            proptest::prop_assert_eq!(actual, expected);
            proptest::prop_assert_eq!(
                out.diagnostics.len(),
                rings.iter().filter(|r| r.is_empty()).count()
            );
        }
    }
}
