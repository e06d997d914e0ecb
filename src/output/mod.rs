use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::controller::DisplayedExtraction;
use crate::history::HistoryRecord;

pub mod formatters;

pub use formatters::*;

/// Render a displayed extraction in the requested format
pub fn render_extraction(displayed: &DisplayedExtraction, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(displayed)),
        OutputFormat::Json => format_as_json(displayed),
    }
}

/// Render the history list in the requested format
pub fn render_history(records: &[HistoryRecord], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_history_as_text(records)),
        OutputFormat::Json => format_history_as_json(records),
    }
}

/// Save a displayed extraction to file
pub async fn save_to_file(
    displayed: &DisplayedExtraction,
    path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    let content = render_extraction(displayed, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print a displayed extraction to console
pub fn print_to_console(displayed: &DisplayedExtraction, format: &OutputFormat) -> Result<()> {
    let content = render_extraction(displayed, format)?;
    println!("{}", content);
    Ok(())
}
