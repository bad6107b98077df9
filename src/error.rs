use thiserror::Error;

/// Everything that can go wrong between reading a DEM and writing a watershed.
#[derive(Error, Debug)]
pub enum HydroError {
    #[error("unresolved depression at ({row}, {col}), {count} depression cells left")]
    UnresolvedDepression { row: usize, col: usize, count: usize },

    #[error("undefined flow direction at ({row}, {col}), {count} interior cells without descent")]
    UndefinedFlowDirection { row: usize, col: usize, count: usize },

    #[error("no stream cell within {max_distance} of pour point ({x}, {y})")]
    PourPointSnapFailure { x: f64, y: f64, max_distance: f64 },

    #[error("pour point ({row}, {col}) is outside a {rows}x{cols} grid")]
    PourPointOutOfBounds { row: usize, col: usize, rows: usize, cols: usize },

    #[error("grid mismatch: expected {expected}, found {found}")]
    GridMismatch { expected: String, found: String },

    #[error("invalid D8 code {code} at ({row}, {col})")]
    InvalidFlowCode { row: usize, col: usize, code: u8 },

    #[error("flow directions form a cycle through ({row}, {col})")]
    CyclicFlow { row: usize, col: usize },

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter { name: &'static str, value: String, reason: String },

    #[error("unsupported raster data type: {0}")]
    UnsupportedDataType(String),

    #[error("raster file is missing the {0} tag")]
    MissingTag(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HydroError>;

impl HydroError {
    pub(crate) fn invalid(name: &'static str, value: impl ToString, reason: &str) -> Self {
        HydroError::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
