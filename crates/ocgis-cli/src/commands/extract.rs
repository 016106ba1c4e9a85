//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use crate::source::DirectoryNoticeSource;
use ocgis_extractor::{BuiltTicket, ExtractorError, TicketRecordBuilder};
use std::path::PathBuf;

/// One notice read by the extract command.
#[derive(Debug)]
pub struct ExtractedNotice {
    /// File name and position of the notice in the file
    pub source: String,
    /// The built record, or why it could not be built
    pub outcome: std::result::Result<BuiltTicket, ExtractorError>,
}

/// Execute the extract command.
pub fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let notices = extract_files(&args.files, config)?;
    println!("{}", formatter.format_notices(&notices, args.diagnostics)?);
    Ok(())
}

/// Build a record from every notice in the given files.
///
/// Unreadable files fail the command; notices that fail extraction are
/// returned with their error.
pub fn extract_files(files: &[PathBuf], config: &Config) -> Result<Vec<ExtractedNotice>> {
    let builder = TicketRecordBuilder::new(&config.extractor)?;
    let source = DirectoryNoticeSource::from_config(&config.source, None);

    let mut extracted = Vec::new();
    for file in files {
        for notice in source.read_file(file, extracted.len())? {
            extracted.push(ExtractedNotice {
                outcome: builder.build(&notice.content),
                source: notice.source,
            });
        }
    }
    Ok(extracted)
}
