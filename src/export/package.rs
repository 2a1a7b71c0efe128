use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Zip the given `(path, content)` parts into an OOXML package.
///
/// `[Content_Types].xml` must be the first part.
pub fn write(parts: &[(String, String)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (path, content) in parts {
        zip.start_file(path.as_str(), options)
            .with_context(|| format!("Failed to add part: {}", path))?;
        zip.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write part: {}", path))?;
    }

    let cursor = zip.finish().context("Failed to finalize package")?;
    Ok(cursor.into_inner())
}
