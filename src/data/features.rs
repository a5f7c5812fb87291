//! Feature table preparation
//!
//! Column naming, feature/label alignment and standard scaling.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::ColumnNames;
use crate::data::labels::id_values;
use crate::error::{DatasetError, Result};
use crate::models::{Label, RawFeatureTable, RawLabelTable, TrainingDataset};

/// Assign positional column names: identifier, time step, then
/// `feature_1..feature_(n-2)`.
pub fn normalize_schema(table: RawFeatureTable, columns: &ColumnNames) -> Result<RawFeatureTable> {
    let mut df = table.into_frame();
    let width = df.width();
    if width < 2 {
        return Err(DatasetError::SchemaMismatch {
            expected: 2,
            actual: width,
        });
    }

    let mut names = Vec::with_capacity(width);
    names.push(columns.id.clone());
    names.push(columns.time_step.clone());
    names.extend((1..width - 1).map(|i| columns.feature(i)));
    df.set_column_names(names)?;

    debug!("Named {} feature columns", width - 2);
    Ok(RawFeatureTable(df))
}

/// Left-join features to labels on the identifier and keep labeled rows only.
///
/// Feature row order is preserved. Rows labeled unknown are dropped, and so
/// are rows without any label entry. The identifier is removed from the
/// resulting feature table.
pub fn align(
    features: RawFeatureTable,
    labels: RawLabelTable,
    columns: &ColumnNames,
) -> Result<TrainingDataset> {
    let labels = labels.into_frame();
    let label_ids = id_values(&labels, &columns.id)?;
    let label_codes = labels.column(&columns.label)?.i32()?;

    let mut index: HashMap<i64, i32> = HashMap::with_capacity(label_ids.len());
    for (row, (id, code)) in label_ids.iter().zip(label_codes.into_iter()).enumerate() {
        let code = code.ok_or_else(|| DatasetError::MissingValue {
            column: columns.label.clone(),
            row,
        })?;
        if index.insert(*id, code).is_some() {
            return Err(DatasetError::DuplicateId(*id));
        }
    }

    let features = features.into_frame();
    let feature_ids = id_values(&features, &columns.id)?;

    let mut keep = Vec::with_capacity(feature_ids.len());
    let mut aligned = Vec::with_capacity(feature_ids.len());
    let mut unmatched = 0usize;
    for id in &feature_ids {
        match index.get(id) {
            Some(&code) if code != Label::Unlabeled.code() => {
                keep.push(true);
                aligned.push(code);
            }
            Some(_) => keep.push(false),
            None => {
                unmatched += 1;
                keep.push(false);
            }
        }
    }

    if unmatched > 0 {
        warn!("{} feature rows have no label entry and were dropped", unmatched);
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let filtered = features.filter(&mask)?.drop(&columns.id)?;

    debug!(
        "Aligned {} of {} feature rows",
        filtered.height(),
        feature_ids.len()
    );
    TrainingDataset::new(filtered, aligned)
}

/// Zero-mean, unit-variance scaler over a set of columns.
///
/// Uses the population standard deviation. Columns with zero variance keep
/// a scale of 1.0 so they map to all zeros instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit means and scales for `columns` of `df`
    pub fn fit(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let mut means = Vec::with_capacity(columns.len());
        let mut scales = Vec::with_capacity(columns.len());

        for name in columns {
            let values = float_values(df, name)?;
            let (mean, std) = mean_std(&values);
            means.push(mean);
            scales.push(if std > 0.0 { std } else { 1.0 });
        }

        Ok(Self {
            columns: columns.to_vec(),
            means,
            scales,
        })
    }

    /// Replace each fitted column of `df` with its scaled values
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();
        for ((name, mean), scale) in self.columns.iter().zip(&self.means).zip(&self.scales) {
            let scaled: Vec<f64> = float_values(df, name)?
                .into_iter()
                .map(|x| (x - mean) / scale)
                .collect();
            out.with_column(Series::new(name.as_str().into(), scaled))?;
        }
        Ok(out)
    }

    pub fn fit_transform(df: &DataFrame, columns: &[String]) -> Result<(Self, DataFrame)> {
        let scaler = Self::fit(df, columns)?;
        let scaled = scaler.transform(df)?;
        Ok((scaler, scaled))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}

/// Scale every column except the time step, then re-attach the untouched
/// time step as the last column.
///
/// The scaler is fit fresh on `features` each call.
pub fn scale(features: &DataFrame, columns: &ColumnNames) -> Result<DataFrame> {
    let time_step = features.column(&columns.time_step)?.clone();
    let rest = features.drop(&columns.time_step)?;

    let names: Vec<String> = rest
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let (scaler, mut scaled) = StandardScaler::fit_transform(&rest, &names)?;
    debug!("Scaled {} columns", scaler.columns().len());

    scaled.with_column(time_step)?;
    Ok(scaled)
}

/// Column values as `f64`, rejecting nulls
fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    column
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| DatasetError::MissingValue {
                column: name.to_string(),
                row,
            })
        })
        .collect()
}

/// Population mean and standard deviation
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
