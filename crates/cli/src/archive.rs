//! Zip packaging of a run's output files.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zip exactly `files` into `out_dir/archive_name`, each stored under its
/// bare file name. Returns the archive path.
pub fn package(files: &[PathBuf], out_dir: &Path, archive_name: &str) -> Result<PathBuf> {
    let path = out_dir.join(archive_name);
    let archive = File::create(&path)
        .with_context(|| format!("Failed to create archive: {}", path.display()))?;

    let mut zip = ZipWriter::new(archive);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in files {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", file.display()))?;
        zip.start_file(name, options)
            .with_context(|| format!("Failed to add {name} to archive"))?;
        let mut source =
            File::open(file).with_context(|| format!("Failed to read {}", file.display()))?;
        std::io::copy(&mut source, &mut zip)?;
        tracing::debug!(entry = name, "archived");
    }

    zip.finish().context("Failed to finish archive")?;
    Ok(path)
}
