use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("a closed polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("pivot sampling needs at least 4 vertices, got {0}")]
    PolygonTooSmall(usize),

    #[error("hard-sphere diameter must be positive and finite, got {0}")]
    InvalidDiameter(f64),

    #[error("coordinate buffer holds {actual} values but {expected} are required")]
    BufferSize { expected: usize, actual: usize },

    #[error("vertex index {index} out of range for a polygon of {len} vertices")]
    VertexOutOfRange { index: usize, len: usize },
}
