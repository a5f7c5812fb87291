//! Label table normalization
//!
//! Maps Elliptic class values to integer codes:
//! "2" (licit) -> 0, "1" (illicit) -> 1, "unknown" -> -1.

use polars::prelude::*;
use tracing::debug;

use crate::config::ColumnNames;
use crate::error::{DatasetError, Result};
use crate::models::{Label, RawLabelTable};

/// Name the label table columns positionally: identifier, then class.
///
/// Extra trailing columns are left as they are.
pub fn normalize_label_schema(table: RawLabelTable, columns: &ColumnNames) -> Result<RawLabelTable> {
    let mut df = table.into_frame();
    if df.width() < 2 {
        return Err(DatasetError::SchemaMismatch {
            expected: 2,
            actual: df.width(),
        });
    }

    let mut names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    names[0] = columns.id.clone();
    names[1] = columns.label.clone();
    df.set_column_names(names)?;

    Ok(RawLabelTable(df))
}

/// Read the transaction ids of a frame as `i64`
pub(crate) fn id_values(df: &DataFrame, id_column: &str) -> Result<Vec<i64>> {
    let ids = df.column(id_column)?.cast(&DataType::Int64)?;
    ids.i64()?
        .into_iter()
        .enumerate()
        .map(|(row, id)| {
            id.ok_or_else(|| DatasetError::MissingValue {
                column: id_column.to_string(),
                row,
            })
        })
        .collect()
}

/// Replace the class column with integer label codes.
///
/// Any value outside {"unknown", "1", "2"} is rejected, as are missing
/// values. The resulting column is `Int32`.
pub fn remap_labels(table: RawLabelTable, columns: &ColumnNames) -> Result<RawLabelTable> {
    let mut df = table.into_frame();
    let ids = id_values(&df, &columns.id)?;

    // Cast first so a file with only "1"/"2" (inferred as integers) is handled
    // the same as one containing "unknown".
    let raw = df.column(&columns.label)?.cast(&DataType::String)?;
    let values = raw.str()?;

    let mut codes = Vec::with_capacity(values.len());
    for (row, (value, id)) in values.into_iter().zip(ids.iter()).enumerate() {
        let value = value.ok_or_else(|| DatasetError::MissingValue {
            column: columns.label.clone(),
            row,
        })?;
        let label = Label::from_raw(value).ok_or_else(|| DatasetError::UnknownLabel {
            id: *id,
            value: value.to_string(),
        })?;
        codes.push(label.code());
    }

    debug!("Remapped {} labels", codes.len());
    df.with_column(Series::new(columns.label.as_str().into(), codes))?;
    Ok(RawLabelTable(df))
}
