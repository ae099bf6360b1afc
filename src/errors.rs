//! Error types for colony analysis.
//!
//! Validation failures are raised before any computation starts. A failure
//! inside one (key, seed, tick) unit is wrapped into [`AnalysisError::UnitFailed`]
//! by the pipeline so it can be reported without aborting sibling units.

use thiserror::Error;

/// Unified error type for all analysis operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A numeric parameter is outside its admissible range
    #[error("invalid parameter `{name}`: {message}")]
    InvalidParameter { name: String, message: String },

    /// Input rows do not have the expected dimensionality
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Not enough points for the requested statistic
    #[error("at least {required} points required, got {actual}")]
    InsufficientPoints { required: usize, actual: usize },

    /// Path whose first and last points coincide
    #[error("degenerate path: first and last points coincide")]
    DegeneratePath,

    /// Empty sample passed to a distributional comparison
    #[error("empty sample: {0}")]
    EmptySample(String),

    /// The same cell id appears twice within one tick
    #[error("duplicate cell id {cell_id} at tick {tick}")]
    DuplicateCell { tick: u32, cell_id: u32 },

    /// A single analysis unit failed
    #[error("unit (key={key}, seed={seed}, tick={tick}) failed: {source}")]
    UnitFailed {
        key: String,
        seed: u32,
        tick: u32,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    pub fn parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        AnalysisError::InvalidShape(message.into())
    }

    pub fn empty(message: impl Into<String>) -> Self {
        AnalysisError::EmptySample(message.into())
    }

    /// Attach unit coordinates to an error raised while analysing that unit.
    pub fn in_unit(self, key: &str, seed: u32, tick: u32) -> Self {
        AnalysisError::UnitFailed {
            key: key.to_string(),
            seed,
            tick,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
