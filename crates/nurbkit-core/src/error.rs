use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("Invalid degree {degree} for {count} control points")]
    InvalidDegree { degree: usize, count: usize },

    #[error("Dimension mismatch: expected {expected} points, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Parameter {param} outside domain [{min}, {max}]")]
    ParameterOutOfRange { param: f64, min: f64, max: f64 },

    #[error("Invalid tolerance: {0} (must be positive and finite)")]
    InvalidTolerance(f64),

    #[error("Invalid sample count {count} (minimum {min})")]
    InvalidSampleCount { count: usize, min: usize },

    #[error("Degenerate normal at (u={u}, v={v})")]
    DegenerateNormal { u: f64, v: f64 },

    #[error("Invalid knot vector: {0}")]
    InvalidKnotVector(String),

    #[error("Invalid weight {weight} at control point {index}")]
    InvalidWeight { index: usize, weight: f64 },

    #[error("Non-finite position at control point {index}")]
    NonFinitePoint { index: usize },

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Unknown handle: {0}")]
    UnknownHandle(String),
}

pub type Result<T> = std::result::Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = KernelError::InvalidDegree { degree: 4, count: 4 };
        assert_eq!(err.to_string(), "Invalid degree 4 for 4 control points");

        let err = KernelError::ParameterOutOfRange {
            param: 1.5,
            min: 0.0,
            max: 1.0,
        };
        assert_eq!(err.to_string(), "Parameter 1.5 outside domain [0, 1]");
    }
}
