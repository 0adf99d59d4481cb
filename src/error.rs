use thiserror::Error;

use crate::row::Field;

/// Failure while producing the startup dataset. Always fatal.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch dataset from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("line {line}: invalid {field} value {value:?}")]
    Malformed {
        line: u64,
        field: Field,
        value: String,
    },

    #[error("unsupported data source: {0}")]
    UnsupportedSource(String),
}

/// A view state that cannot be applied to the dataset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    #[error("edit addresses row {index}, dataset has {len} rows")]
    UnknownRow { index: usize, len: usize },

    #[error("{value:?} is not a valid {field} value")]
    InvalidEdit { field: Field, value: String },

    #[error("number filter is not supported on {field}")]
    FilterNotSupported { field: Field },
}

/// Failure while building or serializing the export workbook.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("row {row}: {field} is not a finite number")]
    NonFinite { row: usize, field: Field },

    #[error("workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[cfg(feature = "web")]
pub use web::AppError;

#[cfg(feature = "web")]
mod web {
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use serde::Serialize;
    use thiserror::Error;

    use super::{ExportError, ViewError};

    /// Errors surfaced by the HTTP handlers.
    #[derive(Debug, Error)]
    pub enum AppError {
        #[error(transparent)]
        View(#[from] ViewError),

        #[error(transparent)]
        Export(#[from] ExportError),
    }

    #[derive(Serialize)]
    struct ErrorResponse {
        status: String,
        message: String,
    }

    impl AppError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                AppError::View(_) => StatusCode::BAD_REQUEST,
                AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            let body = ErrorResponse {
                status: "error".to_string(),
                message: self.to_string(),
            };
            (status, Json(body)).into_response()
        }
    }
}
