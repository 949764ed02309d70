use thiserror::Error;

#[derive(Error, Debug)]
pub enum DesignError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Shift to contour length {length:.3} lies outside the dome contour of length {max:.3}")]
    OutOfContour { length: f64, max: f64 },

    #[error("Winding failure on layer {layer}: {message}")]
    Winding { layer: usize, message: String },

    #[error("Thickness distribution of layer {layer} stayed corrupt after {retries} retries")]
    ThicknessCorruption { layer: usize, retries: usize },

    #[error("Structural failure: {0}")]
    Structural(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DesignError {
    /// Errors raised before any simulation has been started.
    pub fn is_configuration(&self) -> bool {
        matches!(self, DesignError::Configuration(_) | DesignError::Geometry(_))
    }
}

pub type DesignResult<T> = Result<T, DesignError>;
