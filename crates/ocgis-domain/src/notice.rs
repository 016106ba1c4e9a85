//! Notice module - unparsed notice documents

/// One raw notice document as fetched from the notification service.
///
/// `sequence` is assigned at fetch time and defines the batch order used for
/// duplicate resolution, regardless of how extraction is scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotice {
    /// Stable position in the fetched batch
    pub sequence: usize,

    /// Where the notice came from (file name, page and index, ...)
    pub source: String,

    /// Notice markup
    pub content: String,
}

impl RawNotice {
    /// Create a raw notice
    pub fn new(sequence: usize, source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sequence,
            source: source.into(),
            content: content.into(),
        }
    }
}

/// Split a page holding several notices into one document per notice.
///
/// Every notice starts at an occurrence of `marker` and runs up to the next
/// one. Text before the first marker is page chrome and is dropped. A page
/// without any marker is returned whole, unless it is blank.
///
/// # Examples
///
/// ```
/// use ocgis_domain::split_notices;
///
/// let page = "<nav/>IOWA ONE CALL #1 ... IOWA ONE CALL #2 ...";
/// let notices = split_notices(page, "IOWA ONE CALL");
/// assert_eq!(notices, vec!["IOWA ONE CALL #1 ... ", "IOWA ONE CALL #2 ..."]);
/// ```
pub fn split_notices(page: &str, marker: &str) -> Vec<String> {
    if marker.is_empty() {
        return whole_page(page);
    }

    let starts: Vec<usize> = page.match_indices(marker).map(|(idx, _)| idx).collect();
    if starts.is_empty() {
        return whole_page(page);
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(page.len());
            page[start..end].to_string()
        })
        .collect()
}

fn whole_page(page: &str) -> Vec<String> {
    if page.trim().is_empty() {
        Vec::new()
    } else {
        vec![page.to_string()]
    }
}
