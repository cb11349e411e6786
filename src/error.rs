use thiserror::Error;

/// Typed failure conditions surfaced by the store. All other errors
/// (backend I/O, malformed attribute files, ...) propagate as plain
/// `anyhow` errors; callers that need to distinguish these kinds can
/// `downcast_ref::<StoreError>()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Row lookup outside `0..row_count`. Recoverable by the caller.
    #[error("row index {index} is out of range for a ragged array with {rows} rows")]
    IndexOutOfRange { index: usize, rows: usize },

    /// A selection endpoint past the declared extent of an axis.
    /// Selections are never clamped or wrapped.
    #[error("position {index} is out of bounds on axis {axis} with extent {extent}")]
    OutOfBounds {
        axis: usize,
        index: isize,
        extent: usize,
    },

    /// A mutating operation on an already-finished builder.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Persisted offsets violate the monotonicity/closure invariant.
    /// Not recoverable; the data must not be trusted.
    #[error("corrupt ragged data: {0}")]
    CorruptData(String),
}

impl StoreError {
    pub(crate) fn out_of_bounds(axis: usize, index: isize, extent: usize) -> Self {
        StoreError::OutOfBounds {
            axis,
            index,
            extent,
        }
    }
}
