//! All-or-nothing output writing.
//!
//! Every file is first written to a temporary file next to its destination.
//! The temporaries are renamed into place only once all of them were written.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::CliError;

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn stage(path: &Path, contents: &str) -> Result<NamedTempFile, CliError> {
    let write_error = |source| CliError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = NamedTempFile::new_in(parent_dir(path)).map_err(write_error)?;
    file.write_all(contents.as_bytes()).map_err(write_error)?;
    file.flush().map_err(write_error)?;
    Ok(file)
}

/// Write each `(path, contents)` pair. On error no destination is touched,
/// except when a rename itself fails part way.
pub fn write_outputs(outputs: &[(&Path, &str)]) -> Result<(), CliError> {
    let mut staged = Vec::with_capacity(outputs.len());
    for (path, contents) in outputs {
        staged.push((stage(path, contents)?, *path));
    }
    for (file, path) in staged {
        file.persist(path).map_err(|e| CliError::Write {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        tracing::debug!(path = %path.display(), "wrote output");
    }
    Ok(())
}
