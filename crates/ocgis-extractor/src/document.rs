//! Queryable notice documents
//!
//! Extraction never touches markup directly. It goes through two small
//! capabilities: [`QueryDocument`] (selector queries and table discovery) and
//! [`LayoutDocument`] (runs of sibling layout blocks). [`HtmlDocument`]
//! provides both over an HTML tree.

use crate::error::ExtractorError;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// A table flattened to cell text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableData {
    /// Header cells, in column order
    pub headers: Vec<String>,

    /// Body rows, each in column order
    pub rows: Vec<Vec<String>>,
}

/// One block of the notice layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutBlock {
    /// Position of the block in document order
    pub position: usize,

    /// Normalized text of the block
    pub text: String,

    /// Whether the block is a bold label (a ring header)
    pub is_label: bool,
}

/// Tree queries by selector expression
pub trait QueryDocument {
    /// Text (or `attribute` value) of the first element matching `selector`
    fn select_first(
        &self,
        selector: &str,
        attribute: Option<&str>,
    ) -> Result<Option<String>, ExtractorError>;

    /// Every table in document order
    fn tables(&self) -> Vec<TableData>;
}

/// Sibling walks over layout blocks
pub trait LayoutDocument {
    /// Blocks grouped by parent; each run lists siblings in document order
    fn sibling_runs(&self) -> Vec<Vec<LayoutBlock>>;
}

/// An HTML notice
pub struct HtmlDocument {
    html: Html,
    block_selector: Selector,
}

impl HtmlDocument {
    /// Parse markup; `block_selector` picks the layout blocks
    pub fn parse(markup: &str, block_selector: &str) -> Result<Self, ExtractorError> {
        Ok(Self {
            html: Html::parse_document(markup),
            block_selector: parse_selector(block_selector)?,
        })
    }
}

impl QueryDocument for HtmlDocument {
    fn select_first(
        &self,
        selector: &str,
        attribute: Option<&str>,
    ) -> Result<Option<String>, ExtractorError> {
        let selector = parse_selector(selector)?;
        let Some(element) = self.html.select(&selector).next() else {
            return Ok(None);
        };

        Ok(match attribute {
            Some(name) => element.value().attr(name).map(normalize_ws),
            None => Some(element_text(element)),
        })
    }

    fn tables(&self) -> Vec<TableData> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "table")
            .map(read_table)
            .collect()
    }
}

impl LayoutDocument for HtmlDocument {
    fn sibling_runs(&self) -> Vec<Vec<LayoutBlock>> {
        let mut runs: Vec<Vec<LayoutBlock>> = Vec::new();
        let mut run_of_parent = HashMap::new();

        for (position, element) in self.html.select(&self.block_selector).enumerate() {
            let Some(parent) = element.parent() else {
                continue;
            };
            let idx = *run_of_parent.entry(parent.id()).or_insert_with(|| {
                runs.push(Vec::new());
                runs.len() - 1
            });
            runs[idx].push(LayoutBlock {
                position,
                text: element_text(element),
                is_label: is_bold_label(element, &self.block_selector),
            });
        }

        runs
    }
}

/// Collapse whitespace runs into a single space and trim
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractorError> {
    Selector::parse(selector).map_err(|e| ExtractorError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Text of an element; line breaks and cell boundaries become spaces
fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if matches!(el.name(), "br" | "td" | "th" | "p" | "div" | "li") => {
                out.push(' ')
            }
            _ => {}
        }
    }
    normalize_ws(&out)
}

fn read_table(table: ElementRef<'_>) -> TableData {
    // Rows of nested tables belong to those tables
    let rows: Vec<ElementRef<'_>> = table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
        .filter(|tr| {
            tr.ancestors()
                .find(|n| n.value().as_element().is_some_and(|e| e.name() == "table"))
                .is_some_and(|owner| owner.id() == table.id())
        })
        .collect();

    let header_idx = rows
        .iter()
        .position(|tr| cells(*tr).any(|c| c.value().name() == "th"))
        .unwrap_or(0);

    let Some(header_row) = rows.get(header_idx) else {
        return TableData::default();
    };

    TableData {
        headers: cells(*header_row).map(element_text).collect(),
        rows: rows[header_idx + 1..]
            .iter()
            .map(|tr| cells(*tr).map(element_text).collect::<Vec<_>>())
            .filter(|row| !row.is_empty())
            .collect(),
    }
}

fn cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
}

/// A block is a label when it, or anything inside it, is bold.
/// Blocks wrapping other blocks are containers, never labels.
fn is_bold_label(block: ElementRef<'_>, block_selector: &Selector) -> bool {
    let inner = || block.descendants().skip(1).filter_map(ElementRef::wrap);
    if inner().any(|el| block_selector.matches(&el)) {
        return false;
    }
    is_bold(block) || inner().any(is_bold)
}

fn is_bold(element: ElementRef<'_>) -> bool {
    if matches!(element.value().name(), "b" | "strong") {
        return true;
    }
    element.value().attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        ["font-weight:bold", "font-weight:bolder", "font-weight:700"]
            .iter()
            .any(|decl| style.contains(decl))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> HtmlDocument {
        HtmlDocument::parse(html, "div, p").unwrap()
    }

    #[test]
    fn test_normalize_ws() {
        assert_eq!(normalize_ws("  a \n\t b  "), "a b");
        assert_eq!(normalize_ws("\u{a0}Ames\u{a0}"), "Ames");
        assert_eq!(normalize_ws(""), "");
    }

    #[test]
    fn test_select_first_takes_first_match() {
        let d = doc(r#"<span class="t">  12 <br>34 </span><span class="t">99</span>"#);
        assert_eq!(d.select_first("span.t", None).unwrap().as_deref(), Some("12 34"));
        assert_eq!(d.select_first("span.none", None).unwrap(), None);
    }

    #[test]
    fn test_select_attribute() {
        let d = doc(r#"<a class="map" href=" https://maps.example/1 ">map</a>"#);
        assert_eq!(
            d.select_first("a.map", Some("href")).unwrap().as_deref(),
            Some("https://maps.example/1")
        );
        assert_eq!(d.select_first("a.map", Some("title")).unwrap(), None);
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let d = doc("<p>x</p>");
        let err = d.select_first("td[", None).unwrap_err();
        assert!(matches!(err, ExtractorError::Selector { .. }));
    }

    #[test]
    fn test_tables_skip_nested_rows() {
        let d = doc(
            r#"<table>
                 <tr><th>A</th><th>B</th></tr>
                 <tr><td>1</td><td><table><tr><td>inner</td></tr></table></td></tr>
               </table>"#,
        );
        let tables = d.tables();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].headers, vec!["A", "B"]);
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[0].rows[0][0], "1");
        assert_eq!(tables[1].headers, vec!["inner"]);
        assert!(tables[1].rows.is_empty());
    }

    #[test]
    fn test_table_without_th_uses_first_row() {
        let d = doc("<table><tr><td>H1</td></tr><tr><td>v</td></tr></table>");
        let tables = d.tables();
        assert_eq!(tables[0].headers, vec!["H1"]);
        assert_eq!(tables[0].rows, vec![vec!["v".to_string()]]);
    }

    #[test]
    fn test_sibling_runs_detect_labels() {
        let d = doc(
            r#"<section>
                 <div><b>Polygon 1</b></div>
                 <div>(41.5, -93.6)</div>
                 <div style="font-weight: bold">Polygon 2</div>
               </section>
               <footer><p>end</p></footer>"#,
        );
        let runs = d.sibling_runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 3);
        assert!(runs[0][0].is_label);
        assert!(!runs[0][1].is_label);
        assert!(runs[0][2].is_label);
        assert_eq!(runs[0][1].text, "(41.5, -93.6)");
        assert_eq!(runs[1][0].text, "end");
        assert!(runs[0][2].position < runs[1][0].position);
    }

    #[test]
    fn test_nested_bold_labels() {
        let d = HtmlDocument::parse(
            r#"<section>
                 <div><span><b>Polygon 1</b></span></div>
                 <div><font><strong>Polygon 2</strong></font></div>
                 <div><span><span style="font-weight:700">Polygon 3</span></span></div>
                 <div><span>(41.5, -93.6)</span></div>
               </section>"#,
            "section > div",
        )
        .unwrap();
        let runs = d.sibling_runs();
        assert_eq!(runs.len(), 1);
        let labels: Vec<bool> = runs[0].iter().map(|b| b.is_label).collect();
        assert_eq!(labels, vec![true, true, true, false]);
    }

    #[test]
    fn test_container_block_is_not_a_label() {
        let d = doc(
            r#"<div class="polygons">
                 <div><span><b>Polygon 1</b></span></div>
                 <div>(41.5, -93.6)</div>
               </div>"#,
        );
        let runs = d.sibling_runs();
        assert_eq!(runs.len(), 2);
        assert!(!runs[0][0].is_label);
        assert!(runs[1][0].is_label);
    }
}
