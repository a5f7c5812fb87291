//! Raw file loading and dataset preparation

pub mod csv_loader;
pub mod features;
pub mod labels;
pub mod processor;

// Re-export commonly used types
pub use csv_loader::{read_artifact, read_csv, write_artifact};
pub use features::{align, normalize_schema, scale, StandardScaler};
pub use labels::{normalize_label_schema, remap_labels};
pub use processor::{CachePolicy, EllipticProcessor};
