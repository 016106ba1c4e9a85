//! Selector-driven field extraction

use crate::config::SelectorMap;
use crate::document::QueryDocument;
use crate::types::{Diagnostic, FieldExtraction};
use tracing::{debug, warn};

/// Evaluate every selector rule against the document.
///
/// A field is stored only when its selector matches an element with
/// non-blank text. Unmapped fields, misses and selector errors are recorded
/// as diagnostics and never stop the remaining fields.
pub fn extract_fields<D>(doc: &D, selectors: &SelectorMap) -> FieldExtraction
where
    D: QueryDocument + ?Sized,
{
    let mut out = FieldExtraction::default();

    for (field, rule) in selectors {
        if rule.is_unmapped() {
            debug!(field = %field, "Field unmapped, skipping");
            out.diagnostics.push(Diagnostic::FieldUnmapped(field.clone()));
            continue;
        }

        match doc.select_first(rule.selector(), rule.attribute()) {
            Ok(Some(text)) => {
                let value = match rule.strip_prefix() {
                    Some(prefix) => text
                        .strip_prefix(prefix)
                        .map(|rest| rest.trim().to_string())
                        .unwrap_or(text),
                    None => text,
                };
                if value.is_empty() {
                    out.diagnostics.push(not_found(field, rule.selector()));
                } else {
                    out.fields.insert(field.clone(), value);
                }
            }
            Ok(None) => {
                debug!(field = %field, selector = rule.selector(), "No match");
                out.diagnostics.push(not_found(field, rule.selector()));
            }
            Err(e) => {
                warn!(field = %field, error = %e, "Selector failed");
                out.diagnostics.push(Diagnostic::SelectorFailed {
                    field: field.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    out
}

fn not_found(field: &str, selector: &str) -> Diagnostic {
    Diagnostic::FieldNotFound {
        field: field.to_string(),
        selector: selector.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldRule;
    use crate::document::HtmlDocument;

    const NOTICE: &str = r#"
        <table>
          <tr><td class="ticket-number">  2024 0815 001 </td></tr>
          <tr><td class="county">County: Story</td></tr>
          <tr><td class="blank">   </td></tr>
        </table>
        <a class="map" href="https://maps.example/t/1">Map</a>
    "#;

    fn selectors(rules: &[(&str, FieldRule)]) -> SelectorMap {
        rules
            .iter()
            .map(|(field, rule)| (field.to_string(), rule.clone()))
            .collect()
    }

    #[test]
    fn test_extracts_and_normalizes() {
        let doc = HtmlDocument::parse(NOTICE, "div").unwrap();
        let map = selectors(&[("ticketNumber", "td.ticket-number".into())]);

        let out = extract_fields(&doc, &map);
        assert_eq!(out.fields["ticketNumber"], "2024 0815 001");
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_selector_never_produces_field() {
        let doc = HtmlDocument::parse(NOTICE, "div").unwrap();
        let map = selectors(&[("remarks", "".into()), ("county", "  ".into())]);

        let out = extract_fields(&doc, &map);
        assert!(out.fields.is_empty());
        assert_eq!(out.diagnostics.len(), 2);
        assert!(out
            .diagnostics
            .iter()
            .all(|d| matches!(d, Diagnostic::FieldUnmapped(_))));
    }

    #[test]
    fn test_bad_selector_is_isolated() {
        let doc = HtmlDocument::parse(NOTICE, "div").unwrap();
        let map = selectors(&[
            ("broken", "td[".into()),
            ("ticketNumber", "td.ticket-number".into()),
        ]);

        let out = extract_fields(&doc, &map);
        assert_eq!(out.fields.len(), 1);
        assert!(out.fields.contains_key("ticketNumber"));
        assert!(matches!(
            out.diagnostics[0],
            Diagnostic::SelectorFailed { ref field, .. } if field == "broken"
        ));
    }

    #[test]
    fn test_miss_and_blank_text() {
        let doc = HtmlDocument::parse(NOTICE, "div").unwrap();
        let map = selectors(&[("excavator", "td.excavator".into()), ("blank", "td.blank".into())]);

        let out = extract_fields(&doc, &map);
        assert!(out.fields.is_empty());
        assert_eq!(out.diagnostics.len(), 2);
    }

    #[test]
    fn test_detailed_rules() {
        let doc = HtmlDocument::parse(NOTICE, "div").unwrap();
        let map = selectors(&[
            (
                "county",
                FieldRule::Detailed {
                    selector: "td.county".to_string(),
                    attribute: None,
                    strip_prefix: Some("County:".to_string()),
                },
            ),
            (
                "mapLink",
                FieldRule::Detailed {
                    selector: "a.map".to_string(),
                    attribute: Some("href".to_string()),
                    strip_prefix: None,
                },
            ),
        ]);

        let out = extract_fields(&doc, &map);
        assert_eq!(out.fields["county"], "Story");
        assert_eq!(out.fields["mapLink"], "https://maps.example/t/1");
    }
}
