use thiserror::Error;

/// Errors raised while loading or slicing tabular data
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Column not found: {column}")]
    MissingColumn { column: String },

    #[error("Invalid number in column {column}, row {row}: {value:?}")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Column {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors related to preprocessing, fitting and evaluating the model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Not enough rows: need at least {need}, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Column {column} has no observed values to fit on")]
    EmptyColumn { column: String },

    #[error("Invalid test size {0}: must be in (0, 1)")]
    InvalidTestSize(f64),

    #[error("Matrix error: {0}")]
    Matrix(String),

    #[error("Training error: {0}")]
    Fit(String),

    #[error("Predict error: {0}")]
    Predict(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Errors related to drift computation and drift report extraction
#[derive(Debug, Error)]
pub enum DriftError {
    #[error("Column {column} has no observed values in the {side} dataset")]
    EmptySample { column: String, side: &'static str },

    #[error("Statistic error for {column}: {reason}")]
    Statistic { column: String, reason: String },

    #[error("Drift report is missing {path}")]
    MissingKey { path: String },

    #[error("Drift score at {path} is not a number")]
    NotANumber { path: String },

    #[error("Failed to write report {path}: {reason}")]
    Write { path: String, reason: String },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Errors related to the experiment tracking backend
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Invalid tracking URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Tracking server unreachable at {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Tracking server returned {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Unexpected tracking response: {0}")]
    UnexpectedResponse(String),

    #[error("Unsupported artifact store: {0}")]
    UnsupportedArtifactStore(String),

    #[error("Artifact I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
