//! `winetrack-datasets` loads the wine quality dataset, and any other semicolon separated
//! regression dataset, into a [`winetrack::Dataset`].
//!
//! ## Loading a dataset
//!
//! A dataset is addressed with a locator string, either an `http(s)://` URL or a local path.
//! Locators ending in `.gz` are decompressed before parsing. The first row has to contain the
//! column names, the label column becomes the targets and every other column a feature:
//! ```no_run
//! let dataset = winetrack_datasets::winequality(winetrack_datasets::WINEQUALITY_RED_URL)?;
//! let (train, valid) = dataset.split_with_ratio(0.75);
//! # Ok::<(), winetrack_datasets::DataLoadError>(())
//! ```
//!
//! ## Synthetic data
//!
//! The [`generate`] module produces datasets with the shape of the wine quality data, or with a
//! perfectly linear target, for tests and benchmarks. [`write_csv`] writes them back in the same
//! format the loader reads.

use std::io::Write;

use csv::{ReaderBuilder, WriterBuilder};
use ndarray::{s, Array2, Axis};
use ndarray_csv::{Array2Reader, Array2Writer};
use winetrack::Dataset;

mod error;
pub mod generate;
mod source;

pub use error::{DataLoadError, Result};
pub use source::DataSource;

/// Red wine quality data as distributed with the MLflow tutorials
pub const WINEQUALITY_RED_URL: &str =
    "https://raw.githubusercontent.com/mlflow/mlflow/master/tests/datasets/winequality-red.csv";

/// Name of the label column of the wine quality data
pub const WINEQUALITY_TARGET: &str = "quality";

/// Physicochemical features of the wine quality data, in file order
pub const WINEQUALITY_FEATURES: [&str; 11] = [
    "fixed acidity",
    "volatile acidity",
    "citric acid",
    "residual sugar",
    "chlorides",
    "free sulfur dioxide",
    "total sulfur dioxide",
    "density",
    "pH",
    "sulphates",
    "alcohol",
];

/// Read the wine quality dataset, `;` separated with the label column `quality`
pub fn winequality(locator: &str) -> Result<Dataset<f64>> {
    load(&DataSource::parse(locator), WINEQUALITY_TARGET, b';')
}

/// Read a CSV dataset with a header row
///
/// The column `target_column` becomes the targets, all remaining columns the records. Feature
/// names are taken from the header.
pub fn load(source: &DataSource, target_column: &str, separator: u8) -> Result<Dataset<f64>> {
    let buf = source.fetch()?;
    parse(&buf, target_column, separator)
}

fn parse(buf: &[u8], target_column: &str, separator: u8) -> Result<Dataset<f64>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(separator)
        .from_reader(buf);

    let header = reader.headers()?.clone();
    let target_idx = header
        .iter()
        .position(|name| name.trim() == target_column)
        .ok_or_else(|| DataLoadError::MissingColumn(target_column.to_string()))?;

    let array = reader.deserialize_array2_dynamic::<f64>()?;
    if array.nrows() == 0 {
        return Err(DataLoadError::Empty);
    }

    let feature_idx = (0..array.ncols())
        .filter(|idx| *idx != target_idx)
        .collect::<Vec<_>>();
    let records = array.select(Axis(1), &feature_idx);
    let targets = array.column(target_idx).to_owned();

    let feature_names = feature_idx
        .iter()
        .map(|idx| header[*idx].trim().to_string())
        .collect::<Vec<_>>();

    tracing::debug!(
        nsamples = records.nrows(),
        nfeatures = records.ncols(),
        "parsed dataset"
    );

    Ok(Dataset::new(records, targets).with_feature_names(feature_names))
}

/// Write a dataset as CSV with a header row, the targets go into the last column
pub fn write_csv<W: Write>(
    dataset: &Dataset<f64>,
    target_column: &str,
    separator: u8,
    writer: W,
) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(separator).from_writer(writer);

    let mut header = dataset.feature_names();
    header.push(target_column.to_string());
    writer.write_record(&header)?;

    let nfeatures = dataset.nfeatures();
    let mut table = Array2::zeros((dataset.nsamples(), nfeatures + 1));
    table
        .slice_mut(s![.., ..nfeatures])
        .assign(dataset.records());
    table.column_mut(nfeatures).assign(dataset.targets());
    writer.serialize_array2(&table)?;
    writer.flush().map_err(|source| DataLoadError::Io {
        locator: "<writer>".to_string(),
        source,
    })?;

    Ok(())
}
