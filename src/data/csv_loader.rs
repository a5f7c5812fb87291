//! CSV reading and writing for raw lake files and processed artifacts

use polars::prelude::*;
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{DatasetError, Result};

/// Name of the row-index column written in front of every artifact
pub const INDEX_COLUMN: &str = "index";

/// Read a CSV file fully into memory.
///
/// A missing or unreadable file is reported as an I/O error, anything
/// polars rejects while parsing as a parse error.
pub fn read_csv<P: AsRef<Path>>(
    path: P,
    has_header: bool,
    infer_schema_length: Option<usize>,
) -> Result<DataFrame> {
    let path = path.as_ref();
    fs::metadata(path).map_err(|e| DatasetError::io(path, e))?;

    let df = CsvReadOptions::default()
        .with_has_header(has_header)
        .with_infer_schema_length(infer_schema_length)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| DatasetError::parse(path, e))?;

    debug!(
        "Read {:?}: {} rows x {} columns",
        path,
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Write `df` as a row-indexed CSV artifact.
///
/// Missing parent directories are created. The file is written next to the
/// destination first and renamed into place, so readers never see a
/// half-written artifact.
pub fn write_artifact<P: AsRef<Path>>(df: &DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    let staged = stage_artifact(df, path)?;
    commit_artifact(&staged, path)?;

    info!("Stored {} rows to {:?}", df.height(), path);
    Ok(())
}

/// Write `df` to the temporary sibling of `path` and return that sibling.
///
/// The destination itself is not touched. On failure the partial
/// temporary file is removed.
pub fn stage_artifact(df: &DataFrame, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
    }

    let mut indexed = df.clone();
    let index: Vec<i64> = (0..df.height() as i64).collect();
    indexed.insert_column(0, Series::new(INDEX_COLUMN.into(), index))?;

    let tmp_path = temp_path(path);
    let written = File::create(&tmp_path)
        .map_err(|e| DatasetError::io(&tmp_path, e))
        .and_then(|mut file| {
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut indexed)
                .map_err(DatasetError::from)
        });

    if let Err(e) = written {
        discard_staged(&tmp_path);
        return Err(e);
    }

    debug!("Staged {} rows at {:?}", df.height(), tmp_path);
    Ok(tmp_path)
}

/// Move a staged file onto its destination, replacing any previous artifact
pub fn commit_artifact(staged: &Path, path: &Path) -> Result<()> {
    fs::rename(staged, path).map_err(|e| {
        discard_staged(staged);
        DatasetError::io(path, e)
    })
}

/// Best-effort removal of a staged file
pub fn discard_staged(staged: &Path) {
    if staged.is_file() {
        if let Err(e) = fs::remove_file(staged) {
            warn!("Failed to remove staged file {:?}: {}", staged, e);
        }
    }
}

/// Read an artifact written by [`write_artifact`], dropping the index column
pub fn read_artifact<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    let df = read_csv(path, true, None)?;

    let has_index = df
        .get_column_names()
        .iter()
        .any(|name| name.as_str() == INDEX_COLUMN);

    if has_index {
        Ok(df.drop(INDEX_COLUMN)?)
    } else {
        Ok(df)
    }
}

/// Sibling path used while an artifact is being written
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
