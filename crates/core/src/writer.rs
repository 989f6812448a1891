//! Persisting per-intake workbooks.

use crate::config::RunConfig;
use crate::error::TranscriptResult;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use transcripts_sheet::Book;

/// Write each intake's workbook as `<intake><suffix>` under `out_dir`,
/// creating the directory when needed. Paths are returned in write order.
pub fn write_outputs(
    outputs: &IndexMap<String, Book>,
    out_dir: &Path,
    config: &RunConfig,
) -> TranscriptResult<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(outputs.len());
    for (intake, book) in outputs {
        let path = out_dir.join(config.output_file_name(intake));
        book.save_as_xlsx(&path)?;
        tracing::info!(
            intake = %intake,
            sheets = book.sheet_count(),
            path = %path.display(),
            "wrote transcripts"
        );
        written.push(path);
    }
    Ok(written)
}
