use thiserror::Error;

/// Error types for the lre-window library.
///
/// Analysis failures (no window, incomplete profile, rejected replicates) are
/// not errors: they are reported through [`crate::window::WindowOutcome`] and
/// leave the profile zeroed. These variants cover collaborator failures and
/// requests that fall outside the cycle series.
#[derive(Error, Debug)]
pub enum LreError {
    /// Not enough cycles to perform the requested operation.
    #[error("Insufficient data: {cycles} cycles available, {required} required")]
    InsufficientData { cycles: usize, required: usize },

    /// Window boundaries that do not reference existing cycles.
    #[error("Invalid LRE window: start cycle {start}, size {size}, profile has {cycles} cycles")]
    InvalidWindow {
        start: usize,
        size: usize,
        cycles: usize,
    },

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error indicating a singular matrix was encountered.
    #[error("Singular matrix encountered")]
    SingularMatrix,

    /// Error indicating the solver failed to converge.
    #[error("Algorithm failed to converge: {0}")]
    ConvergenceFailure(String),

    /// Error during model evaluation.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// Error raised by a profile store.
    #[error("Store error: {0}")]
    Store(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for lre-window operations.
pub type Result<T> = std::result::Result<T, LreError>;
