use thiserror::Error;

/// Errors raised by the slicing and metric engine.
///
/// Data-dependent conditions (empty slices, undefined statistics) never surface
/// here; they resolve to a metric's badval and a masked result entry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MafError {
    /// Invalid or contradictory configuration (binning parameters, options)
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("column `{column}` is {found}, expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("column `{column}` has {found} rows, table has {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    /// A partition was queried before `setup`
    #[error("slicer has not been set up")]
    NotConfigured,
    #[error("slice index {index} out of range (slice count {count})")]
    SliceOutOfRange { index: usize, count: usize },
    #[error("constraint `{constraint}`: {message}")]
    Constraint { constraint: String, message: String },
    /// A custom slicer or metric name with no registered factory
    #[error("unknown {kind} `{name}`")]
    UnknownPlugin { kind: &'static str, name: String },
    #[error("render failed: {0}")]
    Render(String),
    #[error("persist failed: {0}")]
    Persist(String),
}

impl MafError {
    /// Whether this error belongs to the configuration family (fatal to the
    /// affected bundle only).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnknownColumn(_)
                | Self::ColumnType { .. }
                | Self::ColumnLength { .. }
                | Self::Constraint { .. }
                | Self::UnknownPlugin { .. }
        )
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, MafError>;
