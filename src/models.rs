use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// Normalized transaction class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Unlabeled,
    Licit,
    Illicit,
}

impl Label {
    /// Map a raw Elliptic class value ("unknown", "1", "2")
    pub fn from_raw(value: &str) -> Option<Self> {
        match value {
            "unknown" => Some(Label::Unlabeled),
            "1" => Some(Label::Illicit),
            "2" => Some(Label::Licit),
            _ => None,
        }
    }

    /// Integer code used in the processed dataset
    pub fn code(self) -> i32 {
        match self {
            Label::Unlabeled => -1,
            Label::Licit => 0,
            Label::Illicit => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Label::Unlabeled),
            0 => Some(Label::Licit),
            1 => Some(Label::Illicit),
            _ => None,
        }
    }
}

/// Raw transaction features as read from the lake
#[derive(Debug, Clone)]
pub struct RawFeatureTable(pub DataFrame);

/// Raw transaction classes as read from the lake
#[derive(Debug, Clone)]
pub struct RawLabelTable(pub DataFrame);

impl RawFeatureTable {
    pub fn frame(&self) -> &DataFrame {
        &self.0
    }

    pub fn into_frame(self) -> DataFrame {
        self.0
    }
}

impl RawLabelTable {
    pub fn frame(&self) -> &DataFrame {
        &self.0
    }

    pub fn into_frame(self) -> DataFrame {
        self.0
    }
}

/// Aligned feature table and label sequence.
///
/// Row `i` of `features` belongs to `labels[i]`. Constructed once, never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    features: DataFrame,
    labels: Vec<i32>,
}

impl TrainingDataset {
    /// Pair a feature table with its labels, rejecting length mismatches
    pub fn new(features: DataFrame, labels: Vec<i32>) -> Result<Self> {
        if features.height() != labels.len() {
            return Err(DatasetError::ArtifactMismatch {
                features: features.height(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn features(&self) -> &DataFrame {
        &self.features
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Split into the feature table and label codes without copying
    pub fn into_parts(self) -> (DataFrame, Vec<i32>) {
        (self.features, self.labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels as a single-column frame named `name`
    pub fn labels_frame(&self, name: &str) -> Result<DataFrame> {
        let series = Series::new(name.into(), self.labels.as_slice());
        Ok(DataFrame::new(vec![series.into()])?)
    }

    /// Row and class counts
    pub fn summary(&self) -> DatasetSummary {
        let illicit = self
            .labels
            .iter()
            .filter(|&&l| l == Label::Illicit.code())
            .count();
        let licit = self
            .labels
            .iter()
            .filter(|&&l| l == Label::Licit.code())
            .count();

        DatasetSummary {
            rows: self.len(),
            feature_columns: self.features.width(),
            licit,
            illicit,
        }
    }
}

/// Compact description of a training dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub feature_columns: usize,
    pub licit: usize,
    pub illicit: usize,
}
