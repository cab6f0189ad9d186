use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SalesError {
    #[error("failed to open workbook {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: calamine::Error,
    },

    #[error("failed to read sheet {name:?}: {source}")]
    Sheet {
        name: String,
        source: calamine::Error,
    },

    #[error("invalid column range {0:?}, expected letters like \"B:R\"")]
    ColumnRange(String),

    #[error("required column {0:?} not found in header")]
    MissingColumn(String),

    /// A data row could not be parsed; the whole load is rejected.
    #[error("malformed input at row {row}, column {column:?}: {reason}")]
    MalformedInput {
        row: u32,
        column: String,
        reason: String,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}
