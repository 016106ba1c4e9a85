//! Integration tests for the Extractor

#[cfg(test)]
mod tests {
    use crate::{
        Diagnostic, ExtractorConfig, ExtractorError, MissingStatusTablePolicy,
        TicketRecordBuilder,
    };
    use ocgis_domain::{SpatialReference, TicketStatus};

    const STAMP: i64 = 1_723_700_000_000;

    fn notice(ticket: &str, status_rows: &str, polygons: &str) -> String {
        format!(
            r#"<html><body>
            <h2>IOWA ONE CALL</h2>
            <table class="ticket">
              <tr><td>Ticket</td><td class="ticket-number">{ticket}</td></tr>
              <tr><td>Type</td><td class="ticket-type">NORMAL</td></tr>
              <tr><td>County</td><td class="county">  STORY </td></tr>
              <tr><td>Place</td><td class="place">AMES</td></tr>
            </table>
            <table class="members">
              <tr><th>District</th><th>Company Name</th><th>Status</th></tr>
              {status_rows}
            </table>
            <div class="polygons">
              {polygons}
            </div>
            </body></html>"#
        )
    }

    const NORTH_SOUTH: &str = r#"
        <tr><td>North</td><td>Iowa Gas</td><td>Open - Located</td></tr>
        <tr><td>South</td><td>Iowa Power</td><td>Closed, Marked</td></tr>"#;

    const TWO_POLYGONS: &str = r#"
        <div><b>Polygon 1</b></div>
        <div>(41.60, -93.70)</div>
        <div>(41.61, -93.70)</div>
        <div>Excavation area, see remarks</div>
        <div>(41.61, -93.71)</div>
        <div><b>Polygon 2</b></div>
        <div>(41.70, -93.80)</div>
        <div>(41.71, -93.80)</div>
        <div>(41.71, -93.81)</div>"#;

    fn config() -> ExtractorConfig {
        ExtractorConfig {
            tracked_districts: vec!["North".to_string()],
            closed_statuses: vec!["Closed, Marked".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_full_extraction() {
        let builder = TicketRecordBuilder::new(&config()).unwrap();
        let built = builder
            .build_at(&notice("240815001", NORTH_SOUTH, TWO_POLYGONS), STAMP)
            .unwrap();
        let record = &built.record;

        assert_eq!(record.ticket_number(), "240815001");
        assert_eq!(record.attribute("county"), Some("STORY"));
        assert_eq!(record.attribute("north"), Some("Open - Located"));
        assert_eq!(record.attribute("south"), None);
        assert_eq!(record.status(), Some(TicketStatus::Open));
        assert_eq!(record.attribute("lastAutomaticUpdate"), Some("1723700000000"));

        let geometry = record.geometry();
        assert_eq!(geometry.spatial_reference, SpatialReference::WEB_MERCATOR);
        assert_eq!(geometry.rings.len(), 2);
        assert_eq!(geometry.rings[0].len(), 3);
        assert_eq!(geometry.rings[1].len(), 3);
        // Web Mercator metres, not degrees
        assert!(geometry.rings[0].points[0].x < -10_000_000.0);
    }

    #[test]
    fn test_unmapped_fields_never_appear() {
        let builder = TicketRecordBuilder::new(&config()).unwrap();
        let built = builder
            .build_at(&notice("1", NORTH_SOUTH, TWO_POLYGONS), STAMP)
            .unwrap();

        assert!(built.record.attribute("remarks").is_none());
        assert!(built
            .diagnostics
            .contains(&Diagnostic::FieldUnmapped("remarks".to_string())));
        // Mapped but absent from the notice
        assert!(built.record.attribute("excavator").is_none());
    }

    #[test]
    fn test_status_field_wins_over_selector_field() {
        let rows = r#"
            <tr><td>North</td><td>Iowa Gas</td><td>Open - Located</td></tr>
            <tr><td>County</td><td>Story County</td><td>Open</td></tr>"#;
        let config = ExtractorConfig {
            tracked_districts: vec!["North".to_string(), "County".to_string()],
            ..config()
        };
        let builder = TicketRecordBuilder::new(&config).unwrap();
        let built = builder.build_at(&notice("9", rows, TWO_POLYGONS), STAMP).unwrap();

        // The selector alone would give "STORY"
        assert_eq!(built.record.attribute("county"), Some("Open"));
        assert_eq!(built.record.attribute("place"), Some("AMES"));
    }

    #[test]
    fn test_missing_ticket_number_fails() {
        let builder = TicketRecordBuilder::new(&config()).unwrap();
        let err = builder
            .build_at(&notice("   ", NORTH_SOUTH, TWO_POLYGONS), STAMP)
            .unwrap_err();

        assert_eq!(err, ExtractorError::MissingKey("ticketNumber".to_string()));
    }

    #[test]
    fn test_all_closed_rows() {
        let rows = r#"
            <tr><td>North</td><td>Iowa Gas</td><td>Closed, Marked</td></tr>
            <tr><td>South</td><td>Iowa Power</td><td>Closed, Marked</td></tr>"#;
        let builder = TicketRecordBuilder::new(&config()).unwrap();
        let built = builder.build_at(&notice("7", rows, TWO_POLYGONS), STAMP).unwrap();

        assert_eq!(built.record.status(), Some(TicketStatus::Closed));
    }

    #[test]
    fn test_no_status_rows_is_open() {
        let builder = TicketRecordBuilder::new(&config()).unwrap();
        let built = builder.build_at(&notice("7", "", TWO_POLYGONS), STAMP).unwrap();

        assert_eq!(built.record.status(), Some(TicketStatus::Open));
        assert!(built.diagnostics.contains(&Diagnostic::NoStatusRows));
    }

    #[test]
    fn test_missing_status_table_policies() {
        let markup = r#"<table><tr><td class="ticket-number">42</td></tr></table>"#;

        let builder = TicketRecordBuilder::new(&config()).unwrap();
        assert!(matches!(
            builder.build_at(markup, STAMP),
            Err(ExtractorError::StatusTableMissing(_))
        ));

        let lenient = ExtractorConfig {
            missing_status_table: MissingStatusTablePolicy::FlagOpen,
            ..config()
        };
        let built = TicketRecordBuilder::new(&lenient)
            .unwrap()
            .build_at(markup, STAMP)
            .unwrap();
        assert_eq!(built.record.status(), Some(TicketStatus::Open));
        assert!(built.diagnostics.contains(&Diagnostic::StatusTableMissing));
        assert!(built.diagnostics.contains(&Diagnostic::NoGeometry));
        assert!(built.record.geometry().is_empty());
    }

    #[test]
    fn test_header_without_points_is_dropped() {
        let polygons = r#"
            <div><b>Polygon 1</b></div>
            <div>No coordinates available</div>
            <div><b>Polygon 2</b></div>
            <div>(41.70, -93.80)</div>"#;
        let builder = TicketRecordBuilder::new(&config()).unwrap();
        let built = builder
            .build_at(&notice("9", NORTH_SOUTH, polygons), STAMP)
            .unwrap();

        assert_eq!(built.record.geometry().rings.len(), 1);
        assert!(built
            .diagnostics
            .contains(&Diagnostic::RingWithoutPoints("Polygon 1".to_string())));
    }

    #[test]
    fn test_geographic_target_keeps_degrees() {
        let config = ExtractorConfig {
            target_wkid: 4326,
            ..config()
        };
        let builder = TicketRecordBuilder::new(&config).unwrap();
        let built = builder
            .build_at(&notice("3", NORTH_SOUTH, TWO_POLYGONS), STAMP)
            .unwrap();

        let p = built.record.geometry().rings[0].points[0];
        assert_eq!((p.x, p.y), (-93.70, 41.60));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExtractorConfig {
            closed_statuses: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            TicketRecordBuilder::new(&config),
            Err(ExtractorError::Config(_))
        ));
    }
}
